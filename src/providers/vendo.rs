/// Journey search against a db-rest compatible HTTP API
///
/// db-rest exposes the Deutsche Bahn journey planner (the "vendo" backend
/// behind bahn.de) as plain JSON.
///
/// ## Endpoint
/// `GET {base_url}/journeys`
///
/// ## Parameters used
/// - `from`, `to` - IBNR station ids (e.g. "8000191" for Karlsruhe Hbf)
/// - `departure` - ISO 8601 departure time
/// - `results` - maximum number of journeys
/// - `bestprice` - search the cheapest fares of the day around `departure`
/// - `firstClass` - `true` for 1st class fares, `false` for 2nd class
/// - `transfers` - maximum number of transfers, `0` for direct trains only
/// - `stopovers` - whether to include intermediate stops (not needed here)
///
/// ## Response (fields read by this crate)
/// ```text
/// {
///   "journeys": [{
///     "price": { "amount": 49.9, "currency": "EUR" },
///     "legs": [{
///       "origin": { "name": "Karlsruhe Hbf" },
///       "destination": { "name": "München Hbf" },
///       "departure": "2025-12-19T08:03:00+01:00",
///       "arrival": "2025-12-19T11:15:00+01:00",
///       "line": { "name": "ICE 123" }
///     }]
///   }]
/// }
/// ```
/// `price` is missing for journeys without bookable fares.
use async_trait::async_trait;
use chrono::SecondsFormat;
use std::time::Duration;
use tracing::{debug, info};

use super::{JourneyProvider, JourneyQuery, ProviderError};
use crate::config::{FareClass, ProviderConfig};
use crate::models::JourneyResponse;

#[derive(Debug, Clone)]
pub struct VendoClient {
    client: reqwest::Client,
    base_url: String,
}

impl VendoClient {
    pub fn new(config: &ProviderConfig, contact: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(contact)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn journeys_url(&self, query: &JourneyQuery) -> String {
        let departure = query.departure.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut url = format!(
            "{}/journeys?from={}&to={}&departure={}&results={}&stopovers=false",
            self.base_url,
            urlencoding::encode(&query.origin),
            urlencoding::encode(&query.destination),
            urlencoding::encode(&departure),
            query.results
        );

        if query.best_price {
            url.push_str("&bestprice=true");
        }

        url.push_str(match query.fare_class {
            FareClass::First => "&firstClass=true",
            FareClass::Second => "&firstClass=false",
        });

        if query.direct_only {
            url.push_str("&transfers=0");
        }

        url
    }
}

#[async_trait]
impl JourneyProvider for VendoClient {
    async fn journeys(&self, query: &JourneyQuery) -> Result<JourneyResponse, ProviderError> {
        let url = self.journeys_url(query);

        debug!(url = %url, "Searching journeys");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::StatusError(format!("{}: {}", status, body)));
        }

        let data: JourneyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        info!(
            origin = %query.origin,
            destination = %query.destination,
            journeys = data.journeys.len(),
            "Retrieved journeys"
        );

        Ok(data)
    }
}

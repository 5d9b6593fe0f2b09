pub mod vendo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{Config, FareClass};
use crate::models::JourneyResponse;

/// Parameters of one journey search
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyQuery {
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub results: u32,
    pub best_price: bool,
    pub fare_class: FareClass,
    pub direct_only: bool,
}

impl JourneyQuery {
    pub fn from_config(config: &Config, departure: DateTime<Utc>) -> Self {
        Self {
            origin: config.origin.clone(),
            destination: config.destination.clone(),
            departure,
            results: config.search.results,
            best_price: config.search.best_price,
            fare_class: config.search.fare_class,
            direct_only: config.search.direct_only,
        }
    }
}

/// A journey search backend
#[async_trait]
pub trait JourneyProvider: Send + Sync {
    async fn journeys(&self, query: &JourneyQuery) -> Result<JourneyResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider returned {0}")]
    StatusError(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

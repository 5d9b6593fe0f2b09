use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Response of a journey search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JourneyResponse {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub journeys: Vec<RawJourney>,
}

/// One candidate trip as returned by the provider.
///
/// Every nested field is decoded leniently: a value of the wrong shape is
/// treated as absent instead of rejecting the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJourney {
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub legs: Vec<RawLeg>,
}

impl RawJourney {
    pub fn first_leg(&self) -> Option<&RawLeg> {
        self.legs.first()
    }
}

/// A price needs a numeric `amount`; otherwise the whole price counts as absent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Price {
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLeg {
    #[serde(default, deserialize_with = "lenient")]
    pub line: Option<RawLine>,
    #[serde(default, deserialize_with = "lenient")]
    pub origin: Option<RawStop>,
    #[serde(default, deserialize_with = "lenient")]
    pub destination: Option<RawStop>,
    #[serde(default)]
    pub departure: Option<Value>,
    #[serde(default)]
    pub arrival: Option<Value>,
}

impl RawLeg {
    /// Display name of the line (e.g. "ICE 123")
    pub fn line_name(&self) -> Option<&str> {
        self.line.as_ref().and_then(|l| l.name.as_deref())
    }

    pub fn origin_name(&self) -> Option<&str> {
        self.origin.as_ref().and_then(|s| s.name.as_deref())
    }

    pub fn destination_name(&self) -> Option<&str> {
        self.destination.as_ref().and_then(|s| s.name.as_deref())
    }

    pub fn departure_text(&self) -> Option<String> {
        self.departure.as_ref().and_then(verbatim)
    }

    pub fn arrival_text(&self) -> Option<String> {
        self.arrival.as_ref().and_then(verbatim)
    }
}

/// Strings are kept as sent, other values in their JSON form; `null` is absent
fn verbatim(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLine {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStop {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// One observed price of one journey at one fetch instant
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub fetch_timestamp: DateTime<Utc>,
    pub journey_date: DateTime<Utc>,
    pub train_name: String,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub price_amount: f64,
    pub currency: Option<String>,
}

/// Formats a timestamp the way it is persisted: "2025-12-19T07:00:00.000Z"
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Non-arrays decode to an empty list, malformed elements to `T::default()`
/// so positions are kept.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Departure station id (e.g. "8000191" for Karlsruhe Hbf)
    pub origin: String,
    /// Arrival station id
    pub destination: String,
    /// Contact identifier sent to the journey provider as user agent
    pub contact: String,
    /// Path of the SQLite file holding the price history
    pub database: PathBuf,
    pub provider: ProviderConfig,
    pub schedule: ScheduleConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "8000191".to_string(),
            destination: "8096013".to_string(),
            contact: "railtracker".to_string(),
            database: PathBuf::from("railtracker.db"),
            provider: ProviderConfig::default(),
            schedule: ScheduleConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v6.db.transport.rest".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// When to travel: the next `weekday` at `time_of_day` (local time)
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub weekday: Weekday,
    pub time_of_day: NaiveTime,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekday: Weekday::Fri,
            time_of_day: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub results: u32,
    pub best_price: bool,
    pub fare_class: FareClass,
    pub direct_only: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results: 5,
            best_price: true,
            fare_class: FareClass::Second,
            direct_only: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FareClass {
    First,
    Second,
}

impl FareClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FareClass::First => "first",
            FareClass::Second => "second",
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

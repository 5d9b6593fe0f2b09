use chrono::{DateTime, Local, SubsecRound, TimeZone, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::format_timestamp;
use crate::normalize::normalize;
use crate::providers::{JourneyProvider, JourneyQuery};
use crate::schedule::{self, ScheduleError};
use crate::store::ObservationSink;

/// Outcome of one successful tracker run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub saved_count: u64,
    pub target_date: DateTime<Utc>,
}

/// Runs one price check: resolve the travel date, search, store the prices
pub struct TrackerRunner<P, S> {
    provider: P,
    sink: S,
    config: Config,
}

impl<P: JourneyProvider, S: ObservationSink> TrackerRunner<P, S> {
    pub fn new(provider: P, sink: S, config: Config) -> Self {
        Self {
            provider,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run(&self) -> Result<RunSummary, TrackerError> {
        self.run_at(Local::now()).await
    }

    /// Run with an explicit clock reading; `now` also becomes the fetch timestamp
    pub async fn run_at<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<RunSummary, TrackerError> {
        let when = self.config.schedule;
        let target_date = schedule::next_occurrence(&now, when.weekday, when.time_of_day)?
            .with_timezone(&Utc);
        let fetch_timestamp = now.with_timezone(&Utc).trunc_subsecs(3);

        info!(
            target_date = %format_timestamp(&target_date),
            weekday = %when.weekday,
            origin = %self.config.origin,
            destination = %self.config.destination,
            fare_class = self.config.search.fare_class.as_str(),
            "Starting price check"
        );

        let query = JourneyQuery::from_config(&self.config, target_date);
        let response = self
            .provider
            .journeys(&query)
            .await
            .map_err(|e| TrackerError::QueryFailure(e.to_string()))?;

        if response.journeys.is_empty() {
            info!("No journeys found");
            return Ok(RunSummary {
                saved_count: 0,
                target_date,
            });
        }

        let records: Vec<_> = normalize(&response.journeys, target_date, fetch_timestamp).collect();
        let skipped = response.journeys.len() - records.len();
        if skipped > 0 {
            debug!(skipped, "Skipped journeys without a price");
        }

        self.sink
            .ensure_schema()
            .await
            .map_err(|e| TrackerError::StoreFailure(e.to_string()))?;

        let saved_count = self
            .sink
            .insert_batch(&records)
            .await
            .map_err(|e| TrackerError::StoreFailure(e.to_string()))?;

        for record in &records {
            info!(
                train = %record.train_name,
                departure = record.departure_time.as_deref().unwrap_or("unknown"),
                price = record.price_amount,
                currency = record.currency.as_deref().unwrap_or("unknown"),
                "Saved observation"
            );
        }

        info!(saved = saved_count, "Completed price check");

        Ok(RunSummary {
            saved_count,
            target_date,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Journey query failed: {0}")]
    QueryFailure(String),
    #[error("Storing observations failed: {0}")]
    StoreFailure(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FareClass;
    use crate::models::{JourneyResponse, ObservationRecord};
    use crate::providers::ProviderError;
    use crate::store::{ObservationStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    struct FakeProvider {
        response: serde_json::Value,
        fail: bool,
        queries: Mutex<Vec<JourneyQuery>>,
    }

    impl FakeProvider {
        fn returning(response: serde_json::Value) -> Self {
            Self {
                response,
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning(json!({}))
            }
        }
    }

    #[async_trait]
    impl JourneyProvider for FakeProvider {
        async fn journeys(&self, query: &JourneyQuery) -> Result<JourneyResponse, ProviderError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(ProviderError::StatusError("503 Service Unavailable".to_string()));
            }
            serde_json::from_value(self.response.clone()).map_err(|e| ProviderError::ParseError(e.to_string()))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        fail_schema: bool,
        fail_insert: bool,
        schema_calls: Mutex<usize>,
        batches: Mutex<Vec<Vec<ObservationRecord>>>,
    }

    #[async_trait]
    impl ObservationSink for FakeSink {
        async fn ensure_schema(&self) -> Result<(), StoreError> {
            *self.schema_calls.lock().unwrap() += 1;
            if self.fail_schema {
                return Err(StoreError::SchemaError("database is locked".to_string()));
            }
            Ok(())
        }

        async fn insert_batch(&self, records: &[ObservationRecord]) -> Result<u64, StoreError> {
            self.batches.lock().unwrap().push(records.to_vec());
            if self.fail_insert {
                return Err(StoreError::DatabaseError("disk I/O error".to_string()));
            }
            Ok(records.len() as u64)
        }
    }

    fn saturday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 6, 9, 0, 0).unwrap()
    }

    fn next_friday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 12, 8, 0, 0).unwrap()
    }

    fn two_journeys() -> serde_json::Value {
        json!({
            "journeys": [
                {
                    "price": { "amount": 49.9, "currency": "EUR" },
                    "legs": [{
                        "line": { "name": "ICE 123" },
                        "departure": "2024-01-12T08:03:00Z",
                        "arrival": "2024-01-12T10:15:00Z"
                    }]
                },
                { "legs": [] }
            ]
        })
    }

    #[tokio::test]
    async fn empty_response_skips_the_store() {
        let runner = TrackerRunner::new(
            FakeProvider::returning(json!({ "journeys": [] })),
            FakeSink::default(),
            Config::default(),
        );

        let summary = runner.run_at(saturday_morning()).await.unwrap();

        assert_eq!(summary, RunSummary { saved_count: 0, target_date: next_friday() });
        assert_eq!(*runner.sink().schema_calls.lock().unwrap(), 0);
        assert!(runner.sink().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_uses_target_date_and_search_options() {
        let runner = TrackerRunner::new(
            FakeProvider::returning(json!({ "journeys": [] })),
            FakeSink::default(),
            Config::default(),
        );

        runner.run_at(saturday_morning()).await.unwrap();

        let queries = runner.provider.queries.lock().unwrap();
        assert_eq!(
            *queries,
            vec![JourneyQuery {
                origin: "8000191".to_string(),
                destination: "8096013".to_string(),
                departure: next_friday(),
                results: 5,
                best_price: true,
                fare_class: FareClass::Second,
                direct_only: true,
            }]
        );
    }

    #[tokio::test]
    async fn priced_journeys_are_stored_in_one_batch() {
        let runner = TrackerRunner::new(
            FakeProvider::returning(two_journeys()),
            FakeSink::default(),
            Config::default(),
        );

        let summary = runner.run_at(saturday_morning()).await.unwrap();

        assert_eq!(summary.saved_count, 1);
        assert_eq!(*runner.sink().schema_calls.lock().unwrap(), 1);
        let batches = runner.sink().batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![ObservationRecord {
                fetch_timestamp: saturday_morning(),
                journey_date: next_friday(),
                train_name: "ICE 123".to_string(),
                departure_time: Some("2024-01-12T08:03:00Z".to_string()),
                arrival_time: Some("2024-01-12T10:15:00Z".to_string()),
                price_amount: 49.9,
                currency: Some("EUR".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn query_failure_aborts_before_the_store() {
        let runner = TrackerRunner::new(FakeProvider::failing(), FakeSink::default(), Config::default());

        let err = runner.run_at(saturday_morning()).await.unwrap_err();

        assert!(matches!(err, TrackerError::QueryFailure(_)));
        assert_eq!(*runner.sink().schema_calls.lock().unwrap(), 0);
        assert!(runner.sink().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let sink = FakeSink {
            fail_insert: true,
            ..FakeSink::default()
        };
        let runner = TrackerRunner::new(FakeProvider::returning(two_journeys()), sink, Config::default());

        let err = runner.run_at(saturday_morning()).await.unwrap_err();

        assert!(matches!(err, TrackerError::StoreFailure(_)));
        assert_eq!(runner.sink().batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn schema_failure_stops_before_insert() {
        let sink = FakeSink {
            fail_schema: true,
            ..FakeSink::default()
        };
        let runner = TrackerRunner::new(FakeProvider::returning(two_journeys()), sink, Config::default());

        let err = runner.run_at(saturday_morning()).await.unwrap_err();

        assert!(matches!(err, TrackerError::StoreFailure(_)));
        assert_eq!(*runner.sink().schema_calls.lock().unwrap(), 1);
        assert!(runner.sink().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn runs_against_a_sqlite_store() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let runner = TrackerRunner::new(
            FakeProvider::returning(two_journeys()),
            ObservationStore::from_pool(pool),
            Config::default(),
        );

        runner.run_at(saturday_morning()).await.unwrap();
        runner.run_at(saturday_morning()).await.unwrap();

        let stored = runner.sink().list(None).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|s| s.train_name == "ICE 123"));
        assert!(stored.iter().all(|s| s.journey_date == next_friday()));
    }
}

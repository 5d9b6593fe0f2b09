use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tracing::{debug, info};

use crate::models::{format_timestamp, ObservationRecord};
use crate::normalize::UNKNOWN_TRAIN;

/// Destination for normalized observations
#[async_trait]
pub trait ObservationSink: Send + Sync {
    /// Create the observation table if it does not exist yet
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert all records in one transaction, returning how many were written
    async fn insert_batch(&self, records: &[ObservationRecord]) -> Result<u64, StoreError>;
}

/// Append-only price history in a SQLite file
pub struct ObservationStore {
    pool: SqlitePool,
}

/// An observation read back from the database.
///
/// Rows written by other tools may lack a price, so `price_amount` stays
/// optional here.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub id: i64,
    pub fetch_timestamp: DateTime<Utc>,
    pub journey_date: DateTime<Utc>,
    pub train_name: String,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub price_amount: Option<f64>,
    pub currency: Option<String>,
}

impl StoredObservation {
    /// The stored fields as a record, or `None` when the row has no price
    pub fn into_record(self) -> Option<ObservationRecord> {
        Some(ObservationRecord {
            fetch_timestamp: self.fetch_timestamp,
            journey_date: self.journey_date,
            train_name: self.train_name,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price_amount: self.price_amount?,
            currency: self.currency,
        })
    }
}

#[derive(Debug, FromRow)]
struct ObservationRow {
    id: i64,
    fetch_timestamp: Option<String>,
    journey_date: Option<String>,
    train_name: Option<String>,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    price_amount: Option<f64>,
    currency: Option<String>,
}

impl ObservationStore {
    /// Open the database at `path`, creating the file if it is missing
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        info!(path = %path.display(), "Opened observation database");
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM prices")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Stored observations, oldest fetch first
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<StoredObservation>, StoreError> {
        let rows: Vec<ObservationRow> = sqlx::query_as(
            r#"
            SELECT id, fetch_timestamp, journey_date, train_name, departure_time,
                   arrival_time, price_amount, currency
            FROM prices
            ORDER BY fetch_timestamp ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit.map_or(-1, i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(StoredObservation::try_from).collect()
    }

    async fn insert_record(
        tx: &mut Transaction<'_, Sqlite>,
        record: &ObservationRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO prices (fetch_timestamp, journey_date, train_name, departure_time, arrival_time, price_amount, currency)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(format_timestamp(&record.fetch_timestamp))
        .bind(format_timestamp(&record.journey_date))
        .bind(&record.train_name)
        .bind(&record.departure_time)
        .bind(&record.arrival_time)
        .bind(record.price_amount)
        .bind(&record.currency)
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ObservationSink for ObservationStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fetch_timestamp TEXT,
                journey_date TEXT,
                train_name TEXT,
                departure_time TEXT,
                arrival_time TEXT,
                price_amount REAL,
                currency TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::SchemaError(e.to_string()))?;

        Ok(())
    }

    async fn insert_batch(&self, records: &[ObservationRecord]) -> Result<u64, StoreError> {
        // Dropping `tx` on an early return rolls the whole batch back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        for record in records {
            Self::insert_record(&mut tx, record).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        debug!(count = records.len(), "Committed observation batch");
        Ok(records.len() as u64)
    }
}

impl TryFrom<ObservationRow> for StoredObservation {
    type Error = StoreError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            fetch_timestamp: parse_timestamp(row.id, row.fetch_timestamp.as_deref())?,
            journey_date: parse_timestamp(row.id, row.journey_date.as_deref())?,
            train_name: row.train_name.unwrap_or_else(|| UNKNOWN_TRAIN.to_string()),
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            price_amount: row.price_amount,
            currency: row.currency,
        })
    }
}

fn parse_timestamp(id: i64, value: Option<&str>) -> Result<DateTime<Utc>, StoreError> {
    let value = value.ok_or_else(|| StoreError::DecodeError(format!("row {id}: missing timestamp")))?;
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::DecodeError(format!("row {id}: {value:?}: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    ConnectionError(String),
    #[error("Failed to create schema: {0}")]
    SchemaError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Failed to decode stored row: {0}")]
    DecodeError(String),
}

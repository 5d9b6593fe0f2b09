use chrono::{DateTime, Utc};

use crate::models::{ObservationRecord, RawJourney};

/// Stored as `train_name` when the first leg has no line name
pub const UNKNOWN_TRAIN: &str = "Unknown";

/// Turn raw journeys into observation records.
///
/// Journeys without a price are skipped; a price without a currency is kept.
/// Only the first leg is looked at; a priced journey without legs still
/// yields a record, with the train name set to [`UNKNOWN_TRAIN`] and no
/// departure or arrival.
pub fn normalize<'a>(
    journeys: &'a [RawJourney],
    journey_date: DateTime<Utc>,
    fetch_timestamp: DateTime<Utc>,
) -> impl Iterator<Item = ObservationRecord> + 'a {
    journeys.iter().filter_map(move |journey| {
        let price = journey.price.as_ref()?;
        let leg = journey.first_leg();

        Some(ObservationRecord {
            fetch_timestamp,
            journey_date,
            train_name: leg
                .and_then(|l| l.line_name())
                .unwrap_or(UNKNOWN_TRAIN)
                .to_string(),
            departure_time: leg.and_then(|l| l.departure_text()),
            arrival_time: leg.and_then(|l| l.arrival_text()),
            price_amount: price.amount,
            currency: price.currency.clone(),
        })
    })
}

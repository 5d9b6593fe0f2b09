use chrono::DateTime;

use crate::models::{format_timestamp, RawJourney};
use crate::store::StoredObservation;

/// Console lines for one journey: one per leg, then a summary line
pub fn journey_lines(index: usize, journey: &RawJourney) -> Vec<String> {
    let number = index + 1;
    let price = journey
        .price
        .as_ref()
        .map(|p| with_currency(p.amount, p.currency.as_deref()))
        .unwrap_or_else(|| "No Price".to_string());

    let Some(first_leg) = journey.first_leg() else {
        return vec![format!("Journey {number}: (no legs) | Price: {price}")];
    };

    let mut lines: Vec<String> = journey
        .legs
        .iter()
        .enumerate()
        .map(|(leg_index, leg)| {
            format!(
                "  Leg {}: {} from {} to {}",
                leg_index + 1,
                leg.line_name().unwrap_or("Unknown line"),
                leg.origin_name().unwrap_or("Unknown origin"),
                leg.destination_name().unwrap_or("Unknown destination"),
            )
        })
        .collect();

    let departs = first_leg
        .departure_text()
        .as_deref()
        .map(clock_time)
        .unwrap_or_else(|| "Unknown departure".to_string());

    lines.push(format!(
        "Journey {number} | Train: {} | Departs: {departs} | Price: {price}",
        first_leg.line_name().unwrap_or("Unknown train"),
    ));

    lines
}

/// One line per stored observation, labelled like "ICE 123 (08:03)"
pub fn history_line(observation: &StoredObservation) -> String {
    let label = match observation.departure_time.as_deref() {
        Some(departure) => format!("{} ({})", observation.train_name, clock_time(departure)),
        None => observation.train_name.clone(),
    };
    let price = observation
        .price_amount
        .map(|amount| with_currency(amount, observation.currency.as_deref()))
        .unwrap_or_else(|| "no price".to_string());

    format!(
        "#{} {} | {} | {} | travel {}",
        observation.id,
        format_timestamp(&observation.fetch_timestamp),
        label,
        price,
        format_timestamp(&observation.journey_date),
    )
}

fn with_currency(amount: f64, currency: Option<&str>) -> String {
    match currency {
        Some(currency) => format!("{amount} {currency}"),
        None => amount.to_string(),
    }
}

/// "HH:MM" in the provider's own offset, or the raw value if it is not RFC 3339
fn clock_time(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

//! Timestamp utilities
//!
//! Ingestion timestamps are persisted and exchanged as Unix milliseconds.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::{Error, Result};

/// Legacy ticker timestamp format, e.g. `25.04.2018 12:34:30.314` (UTC)
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.f";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a timestamp to Unix milliseconds
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert Unix milliseconds back to a timestamp
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::InvalidInput(format!("Timestamp out of range: {}", millis)))
}

/// Parse a client-supplied timestamp.
///
/// Accepted forms, tried in order:
/// - Unix milliseconds (`1524659670314`)
/// - RFC 3339 (`2018-04-25T12:34:30.314Z`)
/// - Legacy `DD.MM.YYYY HH:MM:SS.fff`, interpreted as UTC
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Empty timestamp".to_string()));
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = trimmed
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Timestamp out of range: {}", trimmed)))?;
        return from_millis(millis);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, LEGACY_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidInput(format!("Malformed timestamp: {}", trimmed)))
}

/// Format a duration as ISO 8601 (`PnYnDTnHnMnS`, 365-day years).
///
/// Negative durations are clamped to zero.
pub fn format_iso8601_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);

    let days_total = total / 86_400;
    let years = days_total / 365;
    let days = days_total % 365;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    format!("P{}Y{}DT{}H{}M{}S", years, days, hours, minutes, seconds)
}

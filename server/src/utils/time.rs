//! Time utility functions

use chrono::{DateTime, Utc};

/// Timestamps below this are read as Unix seconds, at or above as
/// milliseconds. A digit-count heuristic, not a unit tag.
pub const SECONDS_THRESHOLD: f64 = 10_000_000_000.0;

/// Normalize an epoch timestamp of unknown unit to milliseconds.
pub fn epoch_to_millis(value: f64) -> i64 {
    if value < SECONDS_THRESHOLD {
        (value * 1000.0) as i64
    } else {
        value as i64
    }
}

/// Parse ISO 8601 / RFC 3339 timestamp string to DateTime<Utc>
pub fn parse_iso_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

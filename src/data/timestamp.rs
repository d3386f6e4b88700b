//! Timestamp normalization
//!
//! Every instant the engine compares is a UTC `DateTime`. Naive values are
//! read as UTC, zoned values are converted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::table::Value;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Epoch instants outside 1900-01-01..2200-01-01 are rejected
const EPOCH_MILLIS_RANGE: (f64, f64) = (-2_208_988_800_000.0, 7_258_118_400_000.0);

/// Parse a cell into a UTC instant. Returns None for nulls and unparseable values.
///
/// Numbers are unix epoch values whose unit follows from their magnitude:
/// seconds below 1e11, then milliseconds, microseconds below 1e17, nanoseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Integer(ts) => from_epoch(*ts as f64),
        Value::Number(ts) if ts.is_finite() => from_epoch(*ts),
        Value::Text(s) => parse_str(s.trim()),
        _ => None,
    }
}

fn from_epoch(ts: f64) -> Option<DateTime<Utc>> {
    let magnitude = ts.abs();
    let millis = if magnitude < 1e11 {
        ts * 1e3
    } else if magnitude < 1e14 {
        ts
    } else if magnitude < 1e17 {
        ts / 1e3
    } else {
        ts / 1e6
    };
    let (min, max) = EPOCH_MILLIS_RANGE;
    if !(min..max).contains(&millis) {
        return None;
    }
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in &NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

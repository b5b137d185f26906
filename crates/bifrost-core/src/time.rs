//! Wire timestamp format.
//!
//! Timestamps are stored as Unix seconds and exchanged as
//! `YYYY-MM-DDTHH:MM:SSZ` (always UTC, second precision).

use chrono::{DateTime, NaiveDateTime};

/// `strftime` pattern of the wire format.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render Unix seconds in the wire format.
///
/// Out-of-range values render as an empty string.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(WIRE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a wire-format timestamp into Unix seconds.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(s, WIRE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

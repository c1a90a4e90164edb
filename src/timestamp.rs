//! Timestamp conversion between tracker and planner conventions
//!
//! Trackers emit ISO-8601-ish strings with optional fractional seconds and
//! either a `+00:00`/`Z` offset or a space-separated date/time. Planner
//! documents use the compact form `YYYYMMDDTHHMMSSZ` (UTC, no separators).
//! Conversion truncates sub-second precision and drops explicit offsets
//! (trackers report UTC).

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Compact planner timestamp format
pub const PLANNER_TS_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const TRACKER_TS_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a tracker timestamp into a UTC datetime
///
/// Accepts `2015-06-02T23:16:26.709`, `2015-06-02 21:16:26+00:00`, and
/// trailing-`Z` variants. Fails with `Error::InvalidTimestamp` on anything
/// else; callers must not treat a malformed timestamp as a zero duration.
pub fn parse_tracker_ts(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTimestamp("empty timestamp".to_string()));
    }

    let stripped = strip_offset(trimmed);
    for format in TRACKER_TS_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::InvalidTimestamp(raw.to_string()))
}

/// Convert a tracker timestamp to the planner's compact form
///
/// `2015-06-02T23:16:26.709` becomes `20150602T231626Z`.
pub fn to_planner_ts(raw: &str) -> Result<String> {
    let parsed = parse_tracker_ts(raw)?;
    Ok(parsed.format(PLANNER_TS_FORMAT).to_string())
}

/// Render a UTC datetime in the planner's compact form
pub fn format_planner_ts(ts: DateTime<Utc>) -> String {
    ts.format(PLANNER_TS_FORMAT).to_string()
}

fn strip_offset(value: &str) -> &str {
    let value = value.strip_suffix('Z').unwrap_or(value);
    match value.find('+') {
        Some(idx) => &value[..idx],
        None => value,
    }
}

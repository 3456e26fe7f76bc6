//! Timestamp and calendar-date utilities
//!
//! Dwell-time arithmetic anchors to UTC calendar days throughout the
//! workspace. Zone conversion for display is the presentation layer's job.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

/// Storage format for calendar dates (import dates, scan dates)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for sheet timestamps and report headers
pub const DISPLAY_DATETIME_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Get the current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Format a calendar date for storage (`YYYY-MM-DD`)
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| Error::Internal(format!("Invalid stored date '{}': {}", text, e)))
}

/// Whole days elapsed from `from` to `to` (negative if `to` precedes `from`)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Format an instant for storage (RFC 3339)
pub fn format_datetime(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

/// Parse a stored RFC 3339 instant back to UTC
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored datetime '{}': {}", text, e)))
}

//! Parsed container workbook models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata read from the workbook's Parameters sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetParameters {
    /// Display string, `%m/%d/%y %H:%M:%S` plus the timezone abbreviation
    /// when the source cell carried one
    pub created_at: String,
    /// Calendar date anchoring import tracking. Falls back to the current
    /// processing date when the raw cell cannot be parsed, so dwell time is
    /// then anchored to ingest time rather than true document time. Known
    /// precision limitation: nothing distinguishes a genuine "today" from a
    /// failed parse.
    pub created_at_date: NaiveDate,
    pub created_by: String,
    pub carrier: String,
    /// Canonical location: the segment after the first `" : "` in the raw
    /// location field, or the whole field when no separator is present.
    /// Partition key for all history tracking.
    pub carrier_location: String,
}

/// One group of contiguous data-sheet rows.
///
/// Opens at a primary row (origin, destination, and type all present) and
/// accumulates subsequent rows until another primary row, a separator row,
/// or the end of the sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub origin: String,
    pub destination: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub departure_date: String,
    pub arrival_date: String,
    pub labels: Vec<String>,
    pub total_count: f64,
    pub total_value: f64,
}

/// One parsed workbook: expected labels plus transaction detail.
///
/// Transactions are retained for export completeness only; reconciliation
/// consumes `expected_labels` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Name of the data sheet (the sheet after Parameters)
    pub location_name: String,
    pub parameters: SheetParameters,
    /// Denylist-filtered label set; `BTreeSet` keeps enumeration sorted and
    /// deterministic for payloads
    pub expected_labels: BTreeSet<String>,
    pub transactions: Vec<Transaction>,
}

//! Durable-row models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One physical label at one carrier location, scan-event based.
///
/// Legacy tracking path: retained for per-label lookup and delete. The
/// import-based [`LabelImportHistory`] is authoritative for staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagRecord {
    pub label_id: String,
    pub carrier_location: String,
    pub first_scan_datetime: DateTime<Utc>,
    pub last_scan_datetime: DateTime<Utc>,
    pub scan_count: i64,
}

/// Aggregate scan counters for one carrier location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationStats {
    pub carrier_location: String,
    pub first_scan_date: NaiveDate,
    pub last_scan_date: NaiveDate,
    /// last_scan_date - first_scan_date + 1
    pub days_tracked: i64,
    pub unique_bags: i64,
    pub total_scans: i64,
}

/// One workbook import event with its full label set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: Uuid,
    pub import_date: NaiveDate,
    pub carrier_location: String,
    pub total_labels: i64,
    pub labels: Vec<String>,
}

/// Accumulated import sightings for one (label, carrier location) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelImportHistory {
    pub label_id: String,
    pub carrier_location: String,
    pub first_import_date: NaiveDate,
    pub last_import_date: NaiveDate,
    /// Cardinality of `import_dates`
    pub import_count: i64,
    /// Distinct `YYYY-MM-DD` dates this label was seen at this location
    pub import_dates: Vec<String>,
}

impl LabelImportHistory {
    /// Elapsed days between the first recorded import and `today`.
    ///
    /// Recomputed on read, never stored.
    pub fn days_in_vault(&self, today: NaiveDate) -> i64 {
        (today - self.first_import_date).num_days()
    }
}

//! Response payload types consumed by the presentation layer
//!
//! These are the data contracts for the upload, audit, and export surfaces;
//! rendering (HTML, styled spreadsheets) happens outside this crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use vault_common::db::LocationStats;

use crate::models::audit::AuditSummary;
use crate::models::container::ContainerSnapshot;
use crate::services::import_tracker::{ImportOutcome, LabelDurationStats, StaleLabelInfo};
use crate::services::scan_tracker::ScanRecordOutcome;

/// Upload response: what the workbook declared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub location: String,
    pub created_at: String,
    pub created_by: String,
    pub carrier: String,
    pub carrier_location: String,
    pub total_expected_labels: usize,
    /// Sorted enumeration of the expected-label set
    pub expected_labels: Vec<String>,
}

impl UploadSummary {
    pub fn from_snapshot(snapshot: &ContainerSnapshot) -> Self {
        Self {
            location: snapshot.location_name.clone(),
            created_at: snapshot.parameters.created_at.clone(),
            created_by: snapshot.parameters.created_by.clone(),
            carrier: snapshot.parameters.carrier.clone(),
            carrier_location: snapshot.parameters.carrier_location.clone(),
            total_expected_labels: snapshot.expected_labels.len(),
            expected_labels: snapshot.expected_labels.iter().cloned().collect(),
        }
    }
}

/// Audit response: comparison outcome plus the durable-store side effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub summary: AuditSummary,
    pub matched_labels: Vec<String>,
    pub unmatched_labels: Vec<String>,
    pub expected_not_scanned: Vec<String>,
    /// Per-label scan records keyed by label id
    pub bag_records: BTreeMap<String, ScanRecordOutcome>,
    pub location_stats: Option<LocationStats>,
    /// None when history recording failed; the comparison result stands
    /// regardless
    pub import_outcome: Option<ImportOutcome>,
}

/// Container metadata block of the export payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub location: String,
    pub carrier: String,
    pub created_at: String,
    pub created_by: String,
    pub location_stats: Option<LocationStats>,
}

/// Exportable report: audit result, container metadata, and dwell tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPayload {
    /// Display timestamp of report assembly (UTC)
    pub report_generated: String,
    pub container: ContainerInfo,
    pub summary: AuditSummary,
    pub matched_labels: Vec<String>,
    pub unmatched_labels: Vec<String>,
    pub expected_not_scanned: Vec<String>,
    /// Import-based stale labels (≥3 days), sorted by dwell descending
    pub stale_labels: Vec<StaleLabelInfo>,
    pub stale_count: usize,
    /// Per-label import dwell stats for the expected set
    pub import_durations: HashMap<String, LabelDurationStats>,
}

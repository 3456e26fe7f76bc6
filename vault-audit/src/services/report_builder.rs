//! Export report assembly
//!
//! Combines a reconciliation result with container metadata and dwell
//! tracking into the exportable payload. Rendering is the presentation
//! layer's job.

use std::collections::{BTreeSet, HashMap};

use vault_common::time::{self, DISPLAY_DATETIME_FORMAT};

use crate::models::{AuditResult, ContainerInfo, ExportPayload};
use crate::services::auditor;
use crate::services::import_tracker::{LabelDurationStats, StaleLabelInfo};
use crate::services::scan_tracker::BagDuration;

/// Assemble the export payload.
///
/// The import-based stale list takes precedence for the stale count; the
/// legacy scan-based duration map is only consulted when no import history
/// produced any entries.
pub fn assemble_export(
    expected: &BTreeSet<String>,
    result: &AuditResult,
    container: ContainerInfo,
    stale_labels: Vec<StaleLabelInfo>,
    import_durations: HashMap<String, LabelDurationStats>,
    legacy_durations: Option<&HashMap<String, BagDuration>>,
) -> ExportPayload {
    let stale_count = if !stale_labels.is_empty() {
        stale_labels.len()
    } else if let Some(legacy) = legacy_durations {
        result
            .matched_labels
            .iter()
            .filter(|label| legacy.get(*label).map_or(false, |d| d.is_stale))
            .count()
    } else {
        0
    };

    ExportPayload {
        report_generated: format!("{} UTC", time::now().format(DISPLAY_DATETIME_FORMAT)),
        container,
        summary: auditor::summarize(expected, result),
        matched_labels: result.matched_labels.iter().cloned().collect(),
        unmatched_labels: result.unmatched_labels.iter().cloned().collect(),
        expected_not_scanned: result.expected_not_scanned.iter().cloned().collect(),
        stale_labels,
        stale_count,
        import_durations,
    }
}

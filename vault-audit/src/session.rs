//! Audit session state
//!
//! One active snapshot and one active audit result, owned explicitly by the
//! caller (the request/session boundary) instead of process globals.
//! Mutating operations take `&mut self`, so single-writer access is enforced
//! by ownership rather than a lock.

use tracing::warn;
use vault_common::{Error, Result};

use crate::models::{
    AuditResponse, AuditResult, ContainerInfo, ContainerSnapshot, ExportPayload, UploadSummary,
};
use crate::services::{auditor, report_builder, ImportTracker, ScanTracker};

/// Single-audit session: the current container snapshot and the most recent
/// reconciliation result
#[derive(Default)]
pub struct AuditSession {
    snapshot: Option<ContainerSnapshot>,
    last_result: Option<AuditResult>,
}

impl AuditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly parsed snapshot, replacing any prior one.
    ///
    /// The previous audit result is dropped with the snapshot it described;
    /// only the most recent reconciliation is ever retained.
    pub fn install_snapshot(&mut self, snapshot: ContainerSnapshot) -> UploadSummary {
        let summary = UploadSummary::from_snapshot(&snapshot);
        self.snapshot = Some(snapshot);
        self.last_result = None;
        summary
    }

    pub fn snapshot(&self) -> Option<&ContainerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_result(&self) -> Option<&AuditResult> {
        self.last_result.as_ref()
    }

    /// Run a full audit: reconcile, commit the snapshot's labels to import
    /// history, and record each scan event.
    ///
    /// The comparison itself is pure and always returned; failures on the
    /// persistence side are logged and surface as absent fields in the
    /// response rather than aborting the audit.
    pub async fn complete_audit(
        &mut self,
        scanned: &[String],
        imports: &ImportTracker,
        scans: &ScanTracker,
    ) -> Result<AuditResponse> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::State("Upload a container file first".to_string()))?;

        let result = auditor::audit(&snapshot.expected_labels, scanned);
        let summary = auditor::summarize(&snapshot.expected_labels, &result);

        let import_outcome = match imports
            .record_import(
                snapshot.parameters.created_at_date,
                &snapshot.parameters.carrier_location,
                &snapshot.expected_labels,
            )
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Failed to record import history");
                None
            }
        };

        // Every scan event is recorded individually, duplicates included
        let mut bag_records = std::collections::BTreeMap::new();
        for label in scanned {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            match scans
                .record_scan(label, &snapshot.parameters.carrier_location)
                .await
            {
                Ok(outcome) => {
                    bag_records.insert(label.to_string(), outcome);
                }
                Err(e) => warn!(label, error = %e, "Failed to record scan"),
            }
        }

        let location_stats = match scans
            .location_stats(&snapshot.parameters.carrier_location)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Failed to load location stats");
                None
            }
        };

        let response = AuditResponse {
            summary,
            matched_labels: result.matched_labels.iter().cloned().collect(),
            unmatched_labels: result.unmatched_labels.iter().cloned().collect(),
            expected_not_scanned: result.expected_not_scanned.iter().cloned().collect(),
            bag_records,
            location_stats,
            import_outcome,
        };

        self.last_result = Some(result);
        Ok(response)
    }

    /// Assemble the export payload for the most recent audit.
    ///
    /// Requires an active snapshot and a completed audit; fails with a state
    /// error otherwise, mutating nothing.
    pub async fn export(
        &self,
        imports: &ImportTracker,
        scans: &ScanTracker,
    ) -> Result<ExportPayload> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::State("No container data available".to_string()))?;
        let result = self
            .last_result
            .as_ref()
            .ok_or_else(|| Error::State("No audit results to export".to_string()))?;

        let carrier_location = &snapshot.parameters.carrier_location;

        let location_stats = scans.location_stats(carrier_location).await?;
        let stale_labels = imports.query_stale(Some(carrier_location)).await?;
        let import_durations = imports
            .query_duration_stats(&snapshot.expected_labels, carrier_location)
            .await?;
        let legacy_durations = scans.bag_durations(&snapshot.expected_labels).await?;

        let container = ContainerInfo {
            location: snapshot.location_name.clone(),
            carrier: snapshot.parameters.carrier.clone(),
            created_at: snapshot.parameters.created_at.clone(),
            created_by: snapshot.parameters.created_by.clone(),
            location_stats,
        };

        Ok(report_builder::assemble_export(
            &snapshot.expected_labels,
            result,
            container,
            stale_labels,
            import_durations,
            Some(&legacy_durations),
        ))
    }
}

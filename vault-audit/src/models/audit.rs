//! Reconciliation result models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Three-way partition of scanned against expected labels.
///
/// The three sets are pairwise disjoint; `matched ∪ unmatched` is the
/// deduplicated scanned input and `matched ∪ expected_not_scanned` is the
/// expected set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    /// Count of distinct non-blank scanned labels after trimming
    pub total_scanned: usize,
    /// Scanned and expected
    pub matched_labels: BTreeSet<String>,
    /// Physically present, not accounted for
    pub unmatched_labels: BTreeSet<String>,
    /// Accounted for, not physically found
    pub expected_not_scanned: BTreeSet<String>,
}

/// Read-only projection of an audit result
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_in_expected: usize,
    pub total_scanned: usize,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub not_scanned_count: usize,
}

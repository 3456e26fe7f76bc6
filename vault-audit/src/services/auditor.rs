//! Set-based audit comparison
//!
//! Pure functions: same inputs always yield the same partition. State lives
//! with the caller (see [`crate::session::AuditSession`]).

use std::collections::BTreeSet;

use crate::models::{AuditResult, AuditSummary};

/// Compare scanned labels against the expected set.
///
/// Scanned entries are trimmed, blanks dropped, and duplicates collapsed
/// before the three-way partition is computed.
pub fn audit(expected: &BTreeSet<String>, scanned: &[String]) -> AuditResult {
    let scanned_set: BTreeSet<String> = scanned
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .map(|label| label.to_string())
        .collect();

    let matched_labels: BTreeSet<String> =
        scanned_set.intersection(expected).cloned().collect();
    let unmatched_labels: BTreeSet<String> =
        scanned_set.difference(expected).cloned().collect();
    let expected_not_scanned: BTreeSet<String> =
        expected.difference(&scanned_set).cloned().collect();

    AuditResult {
        total_scanned: scanned_set.len(),
        matched_labels,
        unmatched_labels,
        expected_not_scanned,
    }
}

/// Read-only projection of an audit result
pub fn summarize(expected: &BTreeSet<String>, result: &AuditResult) -> AuditSummary {
    AuditSummary {
        total_in_expected: expected.len(),
        total_scanned: result.total_scanned,
        matched_count: result.matched_labels.len(),
        unmatched_count: result.unmatched_labels.len(),
        not_scanned_count: result.expected_not_scanned.len(),
    }
}

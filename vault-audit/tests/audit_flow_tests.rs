//! End-to-end session flow: upload, audit with history commit, export

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use vault_audit::models::{ContainerSnapshot, SheetParameters};
use vault_audit::services::{ImportTracker, ScanTracker};
use vault_audit::AuditSession;
use vault_common::db::init_memory_database;
use vault_common::{time, Error};

async fn stores() -> Result<(SqlitePool, ImportTracker, ScanTracker)> {
    let pool = init_memory_database().await?;
    Ok((
        pool.clone(),
        ImportTracker::new(pool.clone()),
        ScanTracker::new(pool),
    ))
}

fn snapshot(created_at_date: NaiveDate, labels: &[&str]) -> ContainerSnapshot {
    ContainerSnapshot {
        location_name: "Central Vault".to_string(),
        parameters: SheetParameters {
            created_at: "10/11/25 09:00:00 CDT".to_string(),
            created_at_date,
            created_by: "auditor@example.com".to_string(),
            carrier: "Acme Armored".to_string(),
            carrier_location: "Central Vault".to_string(),
        },
        expected_labels: labels.iter().map(|l| l.to_string()).collect(),
        transactions: Vec::new(),
    }
}

fn scanned(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|l| l.to_string()).collect()
}

#[tokio::test]
async fn audit_without_upload_is_a_state_error() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();

    let result = session
        .complete_audit(&scanned(&["A"]), &imports, &scans)
        .await;
    assert!(matches!(result, Err(Error::State(_))));

    Ok(())
}

#[tokio::test]
async fn export_without_audit_is_a_state_error() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();

    // No snapshot at all
    assert!(matches!(
        session.export(&imports, &scans).await,
        Err(Error::State(_))
    ));

    // Snapshot present but never audited
    session.install_snapshot(snapshot(time::today(), &["A"]));
    assert!(matches!(
        session.export(&imports, &scans).await,
        Err(Error::State(_))
    ));

    Ok(())
}

#[tokio::test]
async fn upload_summary_enumerates_expected_labels_sorted() -> Result<()> {
    let mut session = AuditSession::new();

    let summary = session.install_snapshot(snapshot(time::today(), &["B", "A", "C"]));

    assert_eq!(summary.location, "Central Vault");
    assert_eq!(summary.carrier_location, "Central Vault");
    assert_eq!(summary.total_expected_labels, 3);
    assert_eq!(summary.expected_labels, vec!["A", "B", "C"]);

    Ok(())
}

#[tokio::test]
async fn complete_audit_partitions_and_records() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();
    session.install_snapshot(snapshot(time::today(), &["A", "B", "C"]));

    let response = session
        .complete_audit(&scanned(&["a", "B", "B", "D", ""]), &imports, &scans)
        .await?;

    // Trim/dedup leaves {"a", "B", "D"}
    assert_eq!(response.summary.total_scanned, 3);
    assert_eq!(response.matched_labels, vec!["B"]);
    assert_eq!(response.unmatched_labels, vec!["D", "a"]);
    assert_eq!(response.expected_not_scanned, vec!["A", "C"]);

    // Import history committed for the whole expected set
    let outcome = response.import_outcome.unwrap();
    assert_eq!(outcome.total_labels, 3);
    assert_eq!(outcome.new_count, 3);
    assert_eq!(outcome.stale_count, 0);

    // Scan events recorded per entry, duplicates included, blanks skipped
    assert_eq!(response.bag_records.len(), 3);
    assert_eq!(response.bag_records.get("B").unwrap().record.scan_count, 2);

    let stats = response.location_stats.unwrap();
    assert_eq!(stats.total_scans, 4);
    assert_eq!(stats.unique_bags, 3);

    assert!(session.last_result().is_some());

    Ok(())
}

#[tokio::test]
async fn export_combines_audit_and_dwell_tracking() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();

    // Sheet created four days ago: every label is already past the boundary
    let created = time::today() - Duration::days(4);
    session.install_snapshot(snapshot(created, &["A", "B"]));

    session
        .complete_audit(&scanned(&["A", "X"]), &imports, &scans)
        .await?;

    let payload = session.export(&imports, &scans).await?;

    assert_eq!(payload.container.location, "Central Vault");
    assert_eq!(payload.container.carrier, "Acme Armored");
    assert!(payload.container.location_stats.is_some());

    assert_eq!(payload.matched_labels, vec!["A"]);
    assert_eq!(payload.unmatched_labels, vec!["X"]);
    assert_eq!(payload.expected_not_scanned, vec!["B"]);

    // Import-based staleness drives the report
    assert_eq!(payload.stale_count, 2);
    let ids: Vec<&str> = payload.stale_labels.iter().map(|s| s.label_id.as_str()).collect();
    assert!(ids.contains(&"A") && ids.contains(&"B"));
    assert!(payload.import_durations.get("A").unwrap().is_stale);
    assert_eq!(payload.import_durations.get("A").unwrap().days_in_vault, 4);

    Ok(())
}

#[tokio::test]
async fn fresh_import_exports_no_stale_labels() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();
    session.install_snapshot(snapshot(time::today(), &["A"]));

    session
        .complete_audit(&scanned(&["A"]), &imports, &scans)
        .await?;
    let payload = session.export(&imports, &scans).await?;

    assert!(payload.stale_labels.is_empty());
    // Legacy scan records exist but are fresh, so no fallback count either
    assert_eq!(payload.stale_count, 0);
    assert!(!payload.import_durations.get("A").unwrap().is_stale);

    Ok(())
}

#[tokio::test]
async fn new_upload_replaces_snapshot_and_drops_result() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();

    session.install_snapshot(snapshot(time::today(), &["A"]));
    session
        .complete_audit(&scanned(&["A"]), &imports, &scans)
        .await?;
    assert!(session.last_result().is_some());

    session.install_snapshot(snapshot(time::today(), &["Z"]));
    assert!(session.last_result().is_none());

    let expected: BTreeSet<String> = ["Z".to_string()].into_iter().collect();
    assert_eq!(session.snapshot().unwrap().expected_labels, expected);

    // The stale result from the replaced snapshot is not exportable
    assert!(matches!(
        session.export(&imports, &scans).await,
        Err(Error::State(_))
    ));

    Ok(())
}

#[tokio::test]
async fn repeated_audits_accumulate_history_idempotently() -> Result<()> {
    let (_pool, imports, scans) = stores().await?;
    let mut session = AuditSession::new();
    session.install_snapshot(snapshot(time::today(), &["A"]));

    let first = session
        .complete_audit(&scanned(&["A"]), &imports, &scans)
        .await?;
    let second = session
        .complete_audit(&scanned(&["A"]), &imports, &scans)
        .await?;

    // Same snapshot date replayed: history unchanged
    assert_eq!(first.import_outcome.unwrap().new_count, 1);
    let outcome = second.import_outcome.unwrap();
    assert_eq!(outcome.new_count, 0);
    assert_eq!(outcome.updated_count, 0);

    // Scan counts do accumulate per event
    assert_eq!(second.bag_records.get("A").unwrap().record.scan_count, 2);

    Ok(())
}

//! Per-scan bag and location tracking
//!
//! Event-based tracking updated on every individual scan, as opposed to the
//! per-import batch recording in [`super::import_tracker`]. Kept for
//! operational lookup and delete of individual scan records; the import
//! history store is authoritative for the stale determination.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};
use vault_common::db::{BagRecord, LocationStats};
use vault_common::{time, Error, Result};

use super::import_tracker::STALE_THRESHOLD_DAYS;

/// One recorded scan with its resulting bag state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecordOutcome {
    pub record: BagRecord,
    pub is_first_scan: bool,
}

/// Store-wide scan totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanTotals {
    pub unique_bags: i64,
    pub total_scans: i64,
}

/// Legacy scan-based dwell stats (superseded by import-based tracking)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagDuration {
    pub days_in_vault: i64,
    pub first_scan: DateTime<Utc>,
    pub is_stale: bool,
}

/// Scan-event tracker over bag records and location aggregates
pub struct ScanTracker {
    db: SqlitePool,
}

impl ScanTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record one scan event.
    ///
    /// Upserts the bag record and folds the location aggregates in the same
    /// transaction: a failure in either leaves both untouched.
    pub async fn record_scan(
        &self,
        label_id: &str,
        carrier_location: &str,
    ) -> Result<ScanRecordOutcome> {
        let label_id = label_id.trim();
        if label_id.is_empty() {
            return Err(Error::Validation("Scanned label is empty".to_string()));
        }

        let now = time::now();
        let now_text = time::format_datetime(now);
        let today = time::today();

        let mut tx = self.db.begin().await?;

        let existing: Option<(String, i64)> = sqlx::query_as(
            r#"
            SELECT first_scan_datetime, scan_count
            FROM bag_records
            WHERE label_id = ? AND carrier_location = ?
            "#,
        )
        .bind(label_id)
        .bind(carrier_location)
        .fetch_optional(&mut *tx)
        .await?;

        let (record, is_first_scan) = match existing {
            Some((first_text, scan_count)) => {
                sqlx::query(
                    r#"
                    UPDATE bag_records
                    SET scan_count = scan_count + 1,
                        last_scan_datetime = ?,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE label_id = ? AND carrier_location = ?
                    "#,
                )
                .bind(&now_text)
                .bind(label_id)
                .bind(carrier_location)
                .execute(&mut *tx)
                .await?;

                let record = BagRecord {
                    label_id: label_id.to_string(),
                    carrier_location: carrier_location.to_string(),
                    first_scan_datetime: time::parse_datetime(&first_text)?,
                    last_scan_datetime: now,
                    scan_count: scan_count + 1,
                };
                (record, false)
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO bag_records (
                        label_id, carrier_location,
                        first_scan_datetime, last_scan_datetime, scan_count
                    ) VALUES (?, ?, ?, ?, 1)
                    "#,
                )
                .bind(label_id)
                .bind(carrier_location)
                .bind(&now_text)
                .bind(&now_text)
                .execute(&mut *tx)
                .await?;

                let record = BagRecord {
                    label_id: label_id.to_string(),
                    carrier_location: carrier_location.to_string(),
                    first_scan_datetime: now,
                    last_scan_datetime: now,
                    scan_count: 1,
                };
                (record, true)
            }
        };

        fold_location_stats(&mut tx, carrier_location, is_first_scan, today).await?;

        tx.commit().await?;

        debug!(
            label_id,
            carrier_location, is_first_scan, "Recorded scan event"
        );

        Ok(ScanRecordOutcome {
            record,
            is_first_scan,
        })
    }

    /// Look up one bag by label (most recently scanned first when the label
    /// exists at several locations)
    pub async fn bag(&self, label_id: &str) -> Result<Option<BagRecord>> {
        let row: Option<BagRow> = sqlx::query_as(
            r#"
            SELECT label_id, carrier_location, first_scan_datetime,
                   last_scan_datetime, scan_count
            FROM bag_records
            WHERE label_id = ?
            ORDER BY last_scan_datetime DESC
            LIMIT 1
            "#,
        )
        .bind(label_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(map_bag_row).transpose()
    }

    /// All bags, newest first, with optional pagination
    pub async fn bags(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<BagRecord>> {
        let rows: Vec<BagRow> = sqlx::query_as(
            r#"
            SELECT label_id, carrier_location, first_scan_datetime,
                   last_scan_datetime, scan_count
            FROM bag_records
            ORDER BY first_scan_datetime DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit.unwrap_or(-1))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_bag_row).collect()
    }

    /// Bags recorded at one carrier location
    pub async fn bags_at(&self, carrier_location: &str) -> Result<Vec<BagRecord>> {
        let rows: Vec<BagRow> = sqlx::query_as(
            r#"
            SELECT label_id, carrier_location, first_scan_datetime,
                   last_scan_datetime, scan_count
            FROM bag_records
            WHERE carrier_location = ?
            ORDER BY first_scan_datetime DESC
            "#,
        )
        .bind(carrier_location)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_bag_row).collect()
    }

    /// Delete every scan record for a label.
    ///
    /// Returns false when no record existed; import history is untouched
    /// either way.
    pub async fn delete_bag(&self, label_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bag_records WHERE label_id = ?")
            .bind(label_id)
            .execute(&self.db)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(label_id, "Deleted bag scan records");
        }
        Ok(deleted)
    }

    /// Aggregate counters for one carrier location
    pub async fn location_stats(&self, carrier_location: &str) -> Result<Option<LocationStats>> {
        let row: Option<LocationRow> = sqlx::query_as(
            r#"
            SELECT carrier_location, first_scan_date, last_scan_date,
                   days_tracked, unique_bags, total_scans
            FROM location_trackers
            WHERE carrier_location = ?
            "#,
        )
        .bind(carrier_location)
        .fetch_optional(&self.db)
        .await?;

        row.map(map_location_row).transpose()
    }

    /// Aggregate counters for every tracked location
    pub async fn all_location_stats(&self) -> Result<Vec<LocationStats>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT carrier_location, first_scan_date, last_scan_date,
                   days_tracked, unique_bags, total_scans
            FROM location_trackers
            ORDER BY carrier_location
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_location_row).collect()
    }

    /// Store-wide totals across all bags
    pub async fn totals(&self) -> Result<ScanTotals> {
        let (unique_bags, total_scans): (i64, Option<i64>) = sqlx::query_as(
            "SELECT COUNT(*), SUM(scan_count) FROM bag_records",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(ScanTotals {
            unique_bags,
            total_scans: total_scans.unwrap_or(0),
        })
    }

    /// Legacy scan-based dwell lookup for a label set.
    ///
    /// Superseded by [`super::import_tracker::ImportTracker::query_duration_stats`]
    /// whenever import histories exist.
    pub async fn bag_durations(
        &self,
        label_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, BagDuration>> {
        let rows: Vec<BagRow> = sqlx::query_as(
            r#"
            SELECT label_id, carrier_location, first_scan_datetime,
                   last_scan_datetime, scan_count
            FROM bag_records
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let now = time::now();
        let mut durations = HashMap::new();
        for row in rows {
            let record = map_bag_row(row)?;
            if !label_ids.contains(&record.label_id) {
                continue;
            }
            let days_in_vault = (now - record.first_scan_datetime).num_days();
            durations.insert(
                record.label_id.clone(),
                BagDuration {
                    days_in_vault,
                    first_scan: record.first_scan_datetime,
                    is_stale: days_in_vault >= STALE_THRESHOLD_DAYS,
                },
            );
        }

        Ok(durations)
    }
}

/// Initialize or update the per-location aggregates within the caller's
/// transaction
async fn fold_location_stats(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    carrier_location: &str,
    is_new_bag: bool,
    today: NaiveDate,
) -> Result<()> {
    let today_text = time::format_date(today);

    let existing: Option<(String,)> = sqlx::query_as(
        "SELECT first_scan_date FROM location_trackers WHERE carrier_location = ?",
    )
    .bind(carrier_location)
    .fetch_optional(&mut **tx)
    .await?;

    match existing {
        None => {
            sqlx::query(
                r#"
                INSERT INTO location_trackers (
                    carrier_location, first_scan_date, last_scan_date,
                    days_tracked, unique_bags, total_scans
                ) VALUES (?, ?, ?, 1, ?, 1)
                "#,
            )
            .bind(carrier_location)
            .bind(&today_text)
            .bind(&today_text)
            .bind(if is_new_bag { 1i64 } else { 0i64 })
            .execute(&mut **tx)
            .await?;
        }
        Some((first_text,)) => {
            let first_scan_date = time::parse_date(&first_text)?;
            let days_tracked = time::days_between(first_scan_date, today) + 1;

            sqlx::query(
                r#"
                UPDATE location_trackers
                SET last_scan_date = ?,
                    days_tracked = ?,
                    unique_bags = unique_bags + ?,
                    total_scans = total_scans + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE carrier_location = ?
                "#,
            )
            .bind(&today_text)
            .bind(days_tracked)
            .bind(if is_new_bag { 1i64 } else { 0i64 })
            .bind(carrier_location)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}

type BagRow = (String, String, String, String, i64);
type LocationRow = (String, String, String, i64, i64, i64);

fn map_bag_row(row: BagRow) -> Result<BagRecord> {
    let (label_id, carrier_location, first_text, last_text, scan_count) = row;
    Ok(BagRecord {
        label_id,
        carrier_location,
        first_scan_datetime: time::parse_datetime(&first_text)?,
        last_scan_datetime: time::parse_datetime(&last_text)?,
        scan_count,
    })
}

fn map_location_row(row: LocationRow) -> Result<LocationStats> {
    let (carrier_location, first_text, last_text, days_tracked, unique_bags, total_scans) = row;
    Ok(LocationStats {
        carrier_location,
        first_scan_date: time::parse_date(&first_text)?,
        last_scan_date: time::parse_date(&last_text)?,
        days_tracked,
        unique_bags,
        total_scans,
    })
}

//! Import history tracking
//!
//! Durable, append-only record of label sightings per (label, carrier
//! location) pair. Each workbook commit records one batch and folds every
//! label into its history row; dwell time (`days_in_vault`) is recomputed on
//! read and a label reaching three days is flagged stale. This store is
//! authoritative for staleness; the scan-based path in
//! [`super::scan_tracker`] is not.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};
use uuid::Uuid;
use vault_common::db::{ImportBatch, LabelImportHistory};
use vault_common::{time, Error, Result};

/// Inclusive dwell-time boundary, in days, at which a label counts as stale
pub const STALE_THRESHOLD_DAYS: i64 = 3;

/// Stale entry returned inline from a recording pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleLabelEntry {
    pub label_id: String,
    pub days_in_vault: i64,
    pub first_import_date: NaiveDate,
    pub import_count: i64,
}

/// Aggregate outcome of one import recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub import_date: NaiveDate,
    pub carrier_location: String,
    /// Labels processed (after trimming, blanks skipped)
    pub total_labels: usize,
    /// Labels seen for the first time at this location
    pub new_count: usize,
    /// Existing histories that gained a new date
    pub updated_count: usize,
    pub stale_labels: Vec<StaleLabelEntry>,
    pub stale_count: usize,
}

/// Full stale-label record from the independent query path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleLabelInfo {
    pub label_id: String,
    pub carrier_location: String,
    pub days_in_vault: i64,
    pub first_import_date: NaiveDate,
    pub last_import_date: NaiveDate,
    pub import_count: i64,
    pub import_dates: Vec<String>,
}

/// Per-label dwell stats for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDurationStats {
    pub days_in_vault: i64,
    pub first_import_date: NaiveDate,
    pub is_stale: bool,
    pub import_count: i64,
}

/// Import history store
pub struct ImportTracker {
    db: SqlitePool,
}

impl ImportTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record one workbook import: a batch row plus one history fold per
    /// label.
    ///
    /// Runs in a single transaction; any failure rolls back the whole call.
    /// Replaying an identical (date, location, labels) import is a no-op for
    /// every history row: counts and dates are unchanged. After each fold the
    /// label's dwell time is evaluated against the stale boundary, for new
    /// and pre-existing histories alike.
    pub async fn record_import(
        &self,
        import_date: NaiveDate,
        carrier_location: &str,
        labels: &BTreeSet<String>,
    ) -> Result<ImportOutcome> {
        let today = time::today();
        let date_text = time::format_date(import_date);

        let mut tx = self.db.begin().await?;

        // The batch keeps the full label set redundantly for audit/replay
        let batch_id = Uuid::new_v4();
        let labels_json = serde_json::to_string(&labels.iter().collect::<Vec<_>>())
            .map_err(|e| Error::Internal(format!("Failed to serialize batch labels: {}", e)))?;
        sqlx::query(
            r#"
            INSERT INTO import_batches (batch_id, import_date, carrier_location, total_labels, labels_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_id.to_string())
        .bind(&date_text)
        .bind(carrier_location)
        .bind(labels.len() as i64)
        .bind(&labels_json)
        .execute(&mut *tx)
        .await?;

        let mut total_labels = 0usize;
        let mut new_count = 0usize;
        let mut updated_count = 0usize;
        let mut stale_labels = Vec::new();

        for label in labels {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            total_labels += 1;

            let existing: Option<(String, String, String)> = sqlx::query_as(
                r#"
                SELECT first_import_date, last_import_date, import_dates_json
                FROM label_import_history
                WHERE label_id = ? AND carrier_location = ?
                "#,
            )
            .bind(label)
            .bind(carrier_location)
            .fetch_optional(&mut *tx)
            .await?;

            let (first_import_date, import_count) = match existing {
                None => {
                    let dates_json = serde_json::to_string(&[&date_text]).map_err(|e| {
                        Error::Internal(format!("Failed to serialize import dates: {}", e))
                    })?;
                    sqlx::query(
                        r#"
                        INSERT INTO label_import_history (
                            label_id, carrier_location,
                            first_import_date, last_import_date,
                            import_count, import_dates_json
                        ) VALUES (?, ?, ?, ?, 1, ?)
                        "#,
                    )
                    .bind(label)
                    .bind(carrier_location)
                    .bind(&date_text)
                    .bind(&date_text)
                    .bind(&dates_json)
                    .execute(&mut *tx)
                    .await?;

                    new_count += 1;
                    (import_date, 1i64)
                }
                Some((first_text, last_text, dates_json)) => {
                    let first = time::parse_date(&first_text)?;
                    let last = time::parse_date(&last_text)?;
                    let mut dates: Vec<String> = serde_json::from_str(&dates_json)
                        .map_err(|e| {
                            Error::Internal(format!("Corrupt import date list: {}", e))
                        })?;

                    if dates.iter().any(|d| d == &date_text) {
                        // Same date replayed: no mutation, neither new nor updated
                        (first, dates.len() as i64)
                    } else {
                        dates.push(date_text.clone());
                        let new_first = first.min(import_date);
                        let new_last = last.max(import_date);
                        let dates_json = serde_json::to_string(&dates).map_err(|e| {
                            Error::Internal(format!("Failed to serialize import dates: {}", e))
                        })?;

                        sqlx::query(
                            r#"
                            UPDATE label_import_history
                            SET first_import_date = ?,
                                last_import_date = ?,
                                import_count = ?,
                                import_dates_json = ?,
                                updated_at = CURRENT_TIMESTAMP
                            WHERE label_id = ? AND carrier_location = ?
                            "#,
                        )
                        .bind(time::format_date(new_first))
                        .bind(time::format_date(new_last))
                        .bind(dates.len() as i64)
                        .bind(&dates_json)
                        .bind(label)
                        .bind(carrier_location)
                        .execute(&mut *tx)
                        .await?;

                        updated_count += 1;
                        (new_first, dates.len() as i64)
                    }
                }
            };

            let days_in_vault = (today - first_import_date).num_days();
            if days_in_vault >= STALE_THRESHOLD_DAYS {
                stale_labels.push(StaleLabelEntry {
                    label_id: label.to_string(),
                    days_in_vault,
                    first_import_date,
                    import_count,
                });
            }
        }

        tx.commit().await?;

        info!(
            carrier_location,
            import_date = %date_text,
            total_labels,
            new_count,
            updated_count,
            stale_count = stale_labels.len(),
            "Recorded import batch"
        );

        let stale_count = stale_labels.len();
        Ok(ImportOutcome {
            import_date,
            carrier_location: carrier_location.to_string(),
            total_labels,
            new_count,
            updated_count,
            stale_labels,
            stale_count,
        })
    }

    /// All labels at or past the stale boundary, optionally filtered by
    /// location, sorted by dwell time descending.
    ///
    /// Independent read path from the per-import check; both use the same
    /// inclusive boundary.
    pub async fn query_stale(&self, location: Option<&str>) -> Result<Vec<StaleLabelInfo>> {
        let rows = self.fetch_histories(location).await?;
        let today = time::today();

        let mut stale: Vec<StaleLabelInfo> = rows
            .into_iter()
            .filter_map(|history| {
                let days_in_vault = history.days_in_vault(today);
                if days_in_vault >= STALE_THRESHOLD_DAYS {
                    Some(StaleLabelInfo {
                        label_id: history.label_id,
                        carrier_location: history.carrier_location,
                        days_in_vault,
                        first_import_date: history.first_import_date,
                        last_import_date: history.last_import_date,
                        import_count: history.import_count,
                        import_dates: history.import_dates,
                    })
                } else {
                    None
                }
            })
            .collect();

        stale.sort_by(|a, b| b.days_in_vault.cmp(&a.days_in_vault));

        debug!(
            location = ?location,
            stale_count = stale.len(),
            "Queried stale labels"
        );

        Ok(stale)
    }

    /// Batched dwell-stat lookup for a label set at one location
    pub async fn query_duration_stats(
        &self,
        label_ids: &BTreeSet<String>,
        carrier_location: &str,
    ) -> Result<HashMap<String, LabelDurationStats>> {
        let rows = self.fetch_histories(Some(carrier_location)).await?;
        let today = time::today();

        let mut stats = HashMap::new();
        for history in rows {
            if !label_ids.contains(&history.label_id) {
                continue;
            }
            let days_in_vault = history.days_in_vault(today);
            stats.insert(
                history.label_id.clone(),
                LabelDurationStats {
                    days_in_vault,
                    first_import_date: history.first_import_date,
                    is_stale: days_in_vault >= STALE_THRESHOLD_DAYS,
                    import_count: history.import_count,
                },
            );
        }

        Ok(stats)
    }

    /// Import history for a single label, optionally pinned to a location
    pub async fn label_history(
        &self,
        label_id: &str,
        location: Option<&str>,
    ) -> Result<Option<LabelImportHistory>> {
        let row: Option<HistoryRow> = match location {
            Some(loc) => {
                sqlx::query_as(
                    r#"
                    SELECT label_id, carrier_location, first_import_date,
                           last_import_date, import_count, import_dates_json
                    FROM label_import_history
                    WHERE label_id = ? AND carrier_location = ?
                    "#,
                )
                .bind(label_id)
                .bind(loc)
                .fetch_optional(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT label_id, carrier_location, first_import_date,
                           last_import_date, import_count, import_dates_json
                    FROM label_import_history
                    WHERE label_id = ?
                    "#,
                )
                .bind(label_id)
                .fetch_optional(&self.db)
                .await?
            }
        };

        row.map(map_history_row).transpose()
    }

    /// Recorded import batches, newest first
    pub async fn list_batches(
        &self,
        location: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<ImportBatch>> {
        let mut sql = String::from(
            "SELECT batch_id, import_date, carrier_location, total_labels, labels_json \
             FROM import_batches",
        );
        if location.is_some() {
            sql.push_str(" WHERE carrier_location = ?");
        }
        sql.push_str(" ORDER BY import_date DESC, created_at DESC");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, (String, String, String, i64, String)>(&sql);
        if let Some(loc) = location {
            query = query.bind(loc);
        }
        if let Some(max) = limit {
            query = query.bind(max);
        }

        let rows = query.fetch_all(&self.db).await?;

        rows.into_iter()
            .map(|(batch_id, import_date, carrier_location, total_labels, labels_json)| {
                Ok(ImportBatch {
                    batch_id: Uuid::parse_str(&batch_id)
                        .map_err(|e| Error::Internal(format!("Invalid batch id: {}", e)))?,
                    import_date: time::parse_date(&import_date)?,
                    carrier_location,
                    total_labels,
                    labels: serde_json::from_str(&labels_json)
                        .map_err(|e| Error::Internal(format!("Corrupt batch labels: {}", e)))?,
                })
            })
            .collect()
    }

    async fn fetch_histories(&self, location: Option<&str>) -> Result<Vec<LabelImportHistory>> {
        let rows: Vec<HistoryRow> = match location {
            Some(loc) => {
                sqlx::query_as(
                    r#"
                    SELECT label_id, carrier_location, first_import_date,
                           last_import_date, import_count, import_dates_json
                    FROM label_import_history
                    WHERE carrier_location = ?
                    "#,
                )
                .bind(loc)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT label_id, carrier_location, first_import_date,
                           last_import_date, import_count, import_dates_json
                    FROM label_import_history
                    "#,
                )
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(map_history_row).collect()
    }
}

type HistoryRow = (String, String, String, String, i64, String);

fn map_history_row(row: HistoryRow) -> Result<LabelImportHistory> {
    let (label_id, carrier_location, first_text, last_text, import_count, dates_json) = row;
    Ok(LabelImportHistory {
        label_id,
        carrier_location,
        first_import_date: time::parse_date(&first_text)?,
        last_import_date: time::parse_date(&last_text)?,
        import_count,
        import_dates: serde_json::from_str(&dates_json)
            .map_err(|e| Error::Internal(format!("Corrupt import date list: {}", e)))?,
    })
}

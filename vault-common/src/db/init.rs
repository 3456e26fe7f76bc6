//! Database initialization
//!
//! Creates the database file and schema on first run; safe to call again on
//! every startup (all statements are idempotent).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Open an in-memory database with the full schema (test harness entry point)
pub async fn init_memory_database() -> Result<SqlitePool> {
    // A single pinned connection: every pooled connection to ":memory:"
    // would otherwise open its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(":memory:")
        .await?;
    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while a scan or import commits
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all durable tables and their indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_bag_records_table(pool).await?;
    create_location_trackers_table(pool).await?;
    create_import_batches_table(pool).await?;
    create_label_import_history_table(pool).await?;
    Ok(())
}

/// Create the bag_records table
///
/// One row per physical label per carrier location, scan-event based.
async fn create_bag_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bag_records (
            label_id TEXT NOT NULL,
            carrier_location TEXT NOT NULL,
            first_scan_datetime TEXT NOT NULL,
            last_scan_datetime TEXT NOT NULL,
            scan_count INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (label_id, carrier_location),
            CHECK (scan_count >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bag_records_location ON bag_records(carrier_location)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the location_trackers table
///
/// Aggregate scan counters, one row per carrier location.
async fn create_location_trackers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS location_trackers (
            carrier_location TEXT PRIMARY KEY,
            first_scan_date TEXT NOT NULL,
            last_scan_date TEXT NOT NULL,
            days_tracked INTEGER NOT NULL DEFAULT 1,
            unique_bags INTEGER NOT NULL DEFAULT 0,
            total_scans INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (days_tracked >= 1),
            CHECK (unique_bags >= 0),
            CHECK (total_scans >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the import_batches table
///
/// Each workbook import stores its full label set redundantly for
/// audit/replay.
async fn create_import_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            batch_id TEXT PRIMARY KEY,
            import_date TEXT NOT NULL,
            carrier_location TEXT NOT NULL,
            total_labels INTEGER NOT NULL DEFAULT 0,
            labels_json TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_import_batches_date ON import_batches(import_date)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_import_batches_location ON import_batches(carrier_location)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the label_import_history table
///
/// One row per (label, carrier location) pair; never deleted automatically.
async fn create_label_import_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS label_import_history (
            label_id TEXT NOT NULL,
            carrier_location TEXT NOT NULL,
            first_import_date TEXT NOT NULL,
            last_import_date TEXT NOT NULL,
            import_count INTEGER NOT NULL DEFAULT 1,
            import_dates_json TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (label_id, carrier_location),
            CHECK (import_count >= 1),
            CHECK (first_import_date <= last_import_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_label_import_history_location ON label_import_history(carrier_location)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the QC tables.
//! Table creation is idempotent, so this is safe on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer (parallel station workers)
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the QC schema
///
/// Every connection to `sqlite::memory:` is a separate database, so the
/// pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all QC tables
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_stations_table(pool).await?;
    create_qc_details_table(pool).await?;
    create_data_quality_table(pool).await?;
    Ok(())
}

async fn create_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            code TEXT PRIMARY KEY,
            network TEXT NOT NULL,
            location TEXT NOT NULL DEFAULT '',
            network_group TEXT,
            channel_prefixes TEXT NOT NULL DEFAULT '',
            channel_components TEXT NOT NULL DEFAULT 'E,N,Z',
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-channel daily metrics, keyed by `{code}_{channel}_{date}`
async fn create_qc_details_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_qc_details (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            date TEXT NOT NULL,
            channel TEXT NOT NULL,
            rms REAL NOT NULL,
            amplitude_ratio REAL NOT NULL,
            availability REAL NOT NULL,
            num_gap INTEGER NOT NULL,
            num_overlap INTEGER NOT NULL,
            num_spikes INTEGER NOT NULL,
            perc_above_nhnm REAL NOT NULL,
            perc_below_nlnm REAL NOT NULL,
            linear_dead_channel REAL NOT NULL,
            gsn_dead_channel INTEGER NOT NULL,
            lp_percentage REAL NOT NULL,
            bw_percentage REAL NOT NULL,
            sp_percentage REAL NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_qc_details_code_date ON station_qc_details(code, date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-station daily verdict, one row per (code, date)
async fn create_data_quality_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_data_quality (
            code TEXT NOT NULL,
            date TEXT NOT NULL,
            quality_percentage REAL NOT NULL,
            result TEXT NOT NULL,
            warnings TEXT NOT NULL DEFAULT '[]',
            details TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (code, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

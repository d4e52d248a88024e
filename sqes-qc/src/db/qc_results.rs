//! Station verdict persistence
//!
//! One row per (code, date). Replacement deletes and inserts inside a
//! single transaction so readers never see a station without its verdict.

use crate::error::{QcError, QcResult};
use crate::models::{Classification, StationQuality};
use crate::services::spectral_summary::round2;
use chrono::NaiveDate;
use sqes_common::time::DB_DATE_FORMAT;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

fn date_key(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

/// Score as written to `quality_percentage`, two decimals
pub fn stored_score(score: f64) -> f64 {
    round2(score)
}

/// Store `quality`, replacing any previous verdict for the same station-day
pub async fn replace_station_quality(pool: &SqlitePool, quality: &StationQuality) -> QcResult<()> {
    let warnings = serde_json::to_string(&quality.warnings)?;
    let date = date_key(quality.date);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM station_data_quality WHERE code = ? AND date = ?")
        .bind(&quality.station)
        .bind(&date)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO station_data_quality (
            code, date, quality_percentage, result, warnings, details, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&quality.station)
    .bind(&date)
    .bind(stored_score(quality.score))
    .bind(quality.classification.as_str())
    .bind(&warnings)
    .bind(&quality.details)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    debug!(station = %quality.station, date = %date, "Saved station quality");
    Ok(())
}

fn quality_from_row(row: &SqliteRow) -> QcResult<StationQuality> {
    let date: String = row.try_get("date")?;
    let result: String = row.try_get("result")?;
    let warnings: String = row.try_get("warnings")?;

    Ok(StationQuality {
        station: row.try_get("code")?,
        date: NaiveDate::parse_from_str(&date, DB_DATE_FORMAT)
            .map_err(|e| QcError::InvalidInput(format!("Stored date '{}': {}", date, e)))?,
        score: row.try_get("quality_percentage")?,
        classification: result.parse::<Classification>().map_err(QcError::InvalidInput)?,
        warnings: serde_json::from_str(&warnings)?,
        details: row.try_get("details")?,
    })
}

/// Load the verdict of one station-day
pub async fn load_station_quality(
    pool: &SqlitePool,
    code: &str,
    date: NaiveDate,
) -> QcResult<Option<StationQuality>> {
    let row = sqlx::query(
        r#"
        SELECT code, date, quality_percentage, result, warnings, details
        FROM station_data_quality
        WHERE code = ? AND date = ?
        "#,
    )
    .bind(code)
    .bind(date_key(date))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(quality_from_row).transpose()
}

/// All verdicts for one date, ordered by station code
pub async fn load_results_for_date(pool: &SqlitePool, date: NaiveDate) -> QcResult<Vec<StationQuality>> {
    let rows = sqlx::query(
        r#"
        SELECT code, date, quality_percentage, result, warnings, details
        FROM station_data_quality
        WHERE date = ?
        ORDER BY code
        "#,
    )
    .bind(date_key(date))
    .fetch_all(pool)
    .await?;

    rows.iter().map(quality_from_row).collect()
}

/// Delete the verdict of one station-day
pub async fn delete_station_quality(pool: &SqlitePool, code: &str, date: NaiveDate) -> QcResult<bool> {
    let result = sqlx::query("DELETE FROM station_data_quality WHERE code = ? AND date = ?")
        .bind(code)
        .bind(date_key(date))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every verdict for `date`
pub async fn flush_results(pool: &SqlitePool, date: NaiveDate) -> QcResult<u64> {
    let result = sqlx::query("DELETE FROM station_data_quality WHERE date = ?")
        .bind(date_key(date))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Stations with channel metrics but no verdict for `date`
pub async fn straggler_stations(pool: &SqlitePool, date: NaiveDate) -> QcResult<Vec<String>> {
    let codes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT d.code
        FROM station_qc_details AS d
        LEFT JOIN station_data_quality AS q
          ON d.code = q.code AND d.date = q.date
        WHERE d.date = ? AND q.code IS NULL
        ORDER BY d.code
        "#,
    )
    .bind(date_key(date))
    .fetch_all(pool)
    .await?;
    Ok(codes)
}

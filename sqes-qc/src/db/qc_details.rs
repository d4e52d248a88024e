//! Per-channel daily metrics persistence

use crate::error::QcResult;
use crate::models::{BandPercentages, ComponentMetrics};
use chrono::NaiveDate;
use sqes_common::time::DB_DATE_FORMAT;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

/// Row key of one channel-day
pub fn detail_id(code: &str, channel: &str, date: NaiveDate) -> String {
    format!("{}_{}_{}", code, channel, date.format(DB_DATE_FORMAT))
}

fn date_key(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

fn metrics_from_row(row: &SqliteRow) -> QcResult<ComponentMetrics> {
    let num_gap: i64 = row.try_get("num_gap")?;
    let num_overlap: i64 = row.try_get("num_overlap")?;
    let num_spikes: i64 = row.try_get("num_spikes")?;
    let dcg: i64 = row.try_get("gsn_dead_channel")?;

    Ok(ComponentMetrics {
        channel: row.try_get("channel")?,
        rms: row.try_get("rms")?,
        amplitude_ratio: row.try_get("amplitude_ratio")?,
        availability: row.try_get("availability")?,
        num_gap: u32::try_from(num_gap.max(0)).unwrap_or(u32::MAX),
        num_overlap: u32::try_from(num_overlap.max(0)).unwrap_or(u32::MAX),
        num_spikes: u32::try_from(num_spikes.max(0)).unwrap_or(u32::MAX),
        pct_above_nhnm: row.try_get("perc_above_nhnm")?,
        pct_below_nlnm: row.try_get("perc_below_nlnm")?,
        band_percentages: BandPercentages {
            sp: row.try_get("sp_percentage")?,
            bw: row.try_get("bw_percentage")?,
            lp: row.try_get("lp_percentage")?,
        },
        dcl: row.try_get("linear_dead_channel")?,
        dcg: u8::try_from(dcg.clamp(0, 255)).unwrap_or(u8::MAX),
    })
}

/// Insert or replace the metrics of one channel-day
pub async fn upsert_qc_detail(
    pool: &SqlitePool,
    code: &str,
    date: NaiveDate,
    metrics: &ComponentMetrics,
) -> QcResult<()> {
    let id = detail_id(code, &metrics.channel, date);

    sqlx::query(
        r#"
        INSERT INTO station_qc_details (
            id, code, date, channel, rms, amplitude_ratio, availability,
            num_gap, num_overlap, num_spikes, perc_above_nhnm, perc_below_nlnm,
            linear_dead_channel, gsn_dead_channel, lp_percentage, bw_percentage,
            sp_percentage, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            rms = excluded.rms,
            amplitude_ratio = excluded.amplitude_ratio,
            availability = excluded.availability,
            num_gap = excluded.num_gap,
            num_overlap = excluded.num_overlap,
            num_spikes = excluded.num_spikes,
            perc_above_nhnm = excluded.perc_above_nhnm,
            perc_below_nlnm = excluded.perc_below_nlnm,
            linear_dead_channel = excluded.linear_dead_channel,
            gsn_dead_channel = excluded.gsn_dead_channel,
            lp_percentage = excluded.lp_percentage,
            bw_percentage = excluded.bw_percentage,
            sp_percentage = excluded.sp_percentage,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&id)
    .bind(code)
    .bind(date_key(date))
    .bind(&metrics.channel)
    .bind(metrics.rms)
    .bind(metrics.amplitude_ratio)
    .bind(metrics.availability)
    .bind(i64::from(metrics.num_gap))
    .bind(i64::from(metrics.num_overlap))
    .bind(i64::from(metrics.num_spikes))
    .bind(metrics.pct_above_nhnm)
    .bind(metrics.pct_below_nlnm)
    .bind(metrics.dcl)
    .bind(i64::from(metrics.dcg))
    .bind(metrics.band_percentages.lp)
    .bind(metrics.band_percentages.bw)
    .bind(metrics.band_percentages.sp)
    .execute(pool)
    .await?;

    debug!(id = %id, "Saved QC detail");
    Ok(())
}

/// All channel metrics of one station-day, ordered by channel code
pub async fn load_qc_details(
    pool: &SqlitePool,
    code: &str,
    date: NaiveDate,
) -> QcResult<Vec<ComponentMetrics>> {
    let rows = sqlx::query(
        r#"
        SELECT channel, rms, amplitude_ratio, availability, num_gap, num_overlap, num_spikes,
               perc_above_nhnm, perc_below_nlnm, linear_dead_channel, gsn_dead_channel,
               lp_percentage, bw_percentage, sp_percentage
        FROM station_qc_details
        WHERE code = ? AND date = ?
        ORDER BY channel
        "#,
    )
    .bind(code)
    .bind(date_key(date))
    .fetch_all(pool)
    .await?;

    rows.iter().map(metrics_from_row).collect()
}

/// Delete one channel-day, returning whether a row existed
pub async fn delete_qc_detail(
    pool: &SqlitePool,
    code: &str,
    channel: &str,
    date: NaiveDate,
) -> QcResult<bool> {
    let result = sqlx::query("DELETE FROM station_qc_details WHERE id = ?")
        .bind(detail_id(code, channel, date))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every channel metric for `date`
pub async fn flush_qc_details(pool: &SqlitePool, date: NaiveDate) -> QcResult<u64> {
    let result = sqlx::query("DELETE FROM station_qc_details WHERE date = ?")
        .bind(date_key(date))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Stations with at least `min_channels` channel metrics for `date`
pub async fn stations_with_details(
    pool: &SqlitePool,
    date: NaiveDate,
    min_channels: i64,
) -> QcResult<Vec<String>> {
    let codes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT code
        FROM station_qc_details
        WHERE date = ?
        GROUP BY code
        HAVING COUNT(*) >= ?
        ORDER BY code
        "#,
    )
    .bind(date_key(date))
    .bind(min_channels)
    .fetch_all(pool)
    .await?;
    Ok(codes)
}

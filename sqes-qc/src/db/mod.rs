//! Database access for sqes-qc
//!
//! Free async functions over a shared `SqlitePool`. The schema itself is
//! created by `sqes_common::db::init_database`.

pub mod qc_details;
pub mod qc_results;
pub mod stations;

pub use qc_details::{
    delete_qc_detail, detail_id, flush_qc_details, load_qc_details, stations_with_details,
    upsert_qc_detail,
};
pub use qc_results::{
    delete_station_quality, flush_results, load_results_for_date, load_station_quality,
    replace_station_quality, stored_score, straggler_stations,
};
pub use stations::{count_stations, load_station, load_stations, upsert_station, Station};

use crate::error::QcResult;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::warn;

/// Delete all metrics and verdicts for `date`
///
/// Returns `(details_deleted, results_deleted)`.
pub async fn flush_date(pool: &SqlitePool, date: NaiveDate) -> QcResult<(u64, u64)> {
    warn!(date = %date, "Flushing all QC data");
    let details = flush_qc_details(pool, date).await?;
    let results = flush_results(pool, date).await?;
    Ok((details, results))
}

//! QC run orchestration
//!
//! Runs the date range day by day. Within a day, stations are processed
//! concurrently (`buffer_unordered(worker_count)`); a failing station is
//! logged and counted without affecting the others.
//!
//! Two modes:
//! - **Full**: a [`ChannelPipeline`] computes metrics for each station
//!   still missing them, then stragglers (stations with metrics but no
//!   verdict) are analyzed.
//! - **Analysis only**: no pipeline; every station with persisted metrics
//!   for the day is (re)scored.

use crate::db::{self, Station};
use crate::error::{QcError, QcResult};
use crate::models::{Component, ComponentMetrics, StationQuality};
use crate::services::QcAnalyzer;
use crate::workflow::channel_pipeline::{ChannelPipeline, ChannelStatus};
use chrono::NaiveDate;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use sqes_common::time::date_range;
use sqes_common::DayWindow;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Station codes to process; empty means all registered stations
    pub stations: Vec<String>,
    /// Delete existing metrics and verdicts first (single-day runs only)
    pub flush: bool,
}

impl RunOptions {
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            stations: Vec::new(),
            flush: false,
        }
    }
}

/// Counters of a finished (or cancelled) run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub days: usize,
    /// Stations whose channels went through the pipeline
    pub stations_processed: usize,
    /// Verdicts written
    pub stations_scored: usize,
    pub stations_failed: usize,
    /// Stations already complete for the day
    pub stations_skipped: usize,
    /// Channels that fell back to default metrics
    pub channels_defaulted: usize,
    pub cancelled: bool,
}

impl RunSummary {
    fn absorb(&mut self, other: RunSummary) {
        self.days += other.days;
        self.stations_processed += other.stations_processed;
        self.stations_scored += other.stations_scored;
        self.stations_failed += other.stations_failed;
        self.stations_skipped += other.stations_skipped;
        self.channels_defaulted += other.channels_defaulted;
        self.cancelled |= other.cancelled;
    }
}

/// Station outcome inside one day
enum StationOutcome {
    Scored { defaulted: usize },
    Failed,
    Cancelled,
}

/// QC workflow bound to a database and an engine
pub struct QcWorkflow {
    pool: SqlitePool,
    analyzer: Arc<QcAnalyzer>,
    pipeline: Option<Arc<ChannelPipeline>>,
    worker_count: usize,
}

impl QcWorkflow {
    /// Workflow in full mode
    pub fn new(pool: SqlitePool, analyzer: QcAnalyzer, pipeline: ChannelPipeline, worker_count: usize) -> Self {
        Self {
            pool,
            analyzer: Arc::new(analyzer),
            pipeline: Some(Arc::new(pipeline)),
            worker_count: worker_count.max(1),
        }
    }

    /// Workflow scoring persisted metrics only
    pub fn analysis_only(pool: SqlitePool, analyzer: QcAnalyzer, worker_count: usize) -> Self {
        Self {
            pool,
            analyzer: Arc::new(analyzer),
            pipeline: None,
            worker_count: worker_count.max(1),
        }
    }

    pub fn is_analysis_only(&self) -> bool {
        self.pipeline.is_none()
    }

    /// Run every day of `options`
    pub async fn run(&self, options: &RunOptions, cancel: &CancellationToken) -> QcResult<RunSummary> {
        let days = date_range(options.start, options.end)?;

        if options.flush && days.len() > 1 {
            return Err(QcError::InvalidInput(
                "Flush is only allowed for single-day runs".to_string(),
            ));
        }

        let stations = self.select_stations(&options.stations).await?;

        info!(
            start = %options.start,
            end = %options.end,
            days = days.len(),
            stations = stations.len(),
            workers = self.worker_count,
            analysis_only = self.is_analysis_only(),
            "QC run starting"
        );

        let mut summary = RunSummary::default();

        for date in days {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            if options.flush {
                let (details, results) = db::flush_date(&self.pool, date).await?;
                info!(date = %date, details, results, "Flushed existing QC data");
            }

            let day_summary = if self.is_analysis_only() {
                self.analyze_day(date, &options.stations, cancel).await?
            } else {
                self.process_day(date, &stations, cancel).await?
            };

            info!(
                date = %date,
                scored = day_summary.stations_scored,
                failed = day_summary.stations_failed,
                skipped = day_summary.stations_skipped,
                "Day finished"
            );
            summary.absorb(day_summary);
        }

        if cancel.is_cancelled() {
            summary.cancelled = true;
        }

        info!(
            days = summary.days,
            scored = summary.stations_scored,
            failed = summary.stations_failed,
            cancelled = summary.cancelled,
            "QC run finished"
        );

        Ok(summary)
    }

    async fn select_stations(&self, codes: &[String]) -> QcResult<Vec<Station>> {
        let stations = db::load_stations(&self.pool, codes).await?;

        for code in codes {
            if !stations.iter().any(|s| &s.code == code) {
                warn!(station = %code, "Station not registered, skipping");
            }
        }

        Ok(stations)
    }

    /// Full-mode processing of one day
    pub async fn process_day(
        &self,
        date: NaiveDate,
        stations: &[Station],
        cancel: &CancellationToken,
    ) -> QcResult<RunSummary> {
        let day = DayWindow::for_date(date);
        let mut summary = RunSummary {
            days: 1,
            ..RunSummary::default()
        };

        let complete: BTreeSet<String> = db::stations_with_details(&self.pool, date, Component::ALL.len() as i64)
            .await?
            .into_iter()
            .collect();

        let pending: Vec<&Station> = stations
            .iter()
            .filter(|s| !complete.contains(&s.code))
            .collect();
        summary.stations_skipped = stations.len() - pending.len();

        let total = pending.len();
        let finished = Arc::new(AtomicUsize::new(0));

        let outcomes: Vec<StationOutcome> = stream::iter(pending)
            .map(|station| {
                let finished = Arc::clone(&finished);
                let cancel = cancel.clone();

                async move {
                    if cancel.is_cancelled() {
                        return StationOutcome::Cancelled;
                    }

                    let outcome = match self.process_station(station, &day).await {
                        Ok((_, defaulted)) => StationOutcome::Scored { defaulted },
                        Err(e) => {
                            error!(station = %station.code, date = %date, error = %e, "Station processing failed");
                            StationOutcome::Failed
                        }
                    };

                    let current = finished.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % 10 == 0 || current == total {
                        info!(date = %date, progress = format!("{}/{}", current, total), "Station progress");
                    }

                    outcome
                }
            })
            .buffer_unordered(self.worker_count)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                StationOutcome::Scored { defaulted } => {
                    summary.stations_processed += 1;
                    summary.stations_scored += 1;
                    summary.channels_defaulted += defaulted;
                }
                StationOutcome::Failed => summary.stations_failed += 1,
                StationOutcome::Cancelled => summary.cancelled = true,
            }
        }

        if summary.cancelled {
            return Ok(summary);
        }

        // Stations with metrics from an earlier, interrupted run
        let selected: BTreeSet<&str> = stations.iter().map(|s| s.code.as_str()).collect();
        let stragglers: Vec<String> = db::straggler_stations(&self.pool, date)
            .await?
            .into_iter()
            .filter(|code| selected.contains(code.as_str()))
            .collect();

        if !stragglers.is_empty() {
            info!(date = %date, count = stragglers.len(), "Analyzing straggler stations");
            let straggler_summary = self.score_persisted(date, stragglers, cancel).await;
            summary.stations_scored += straggler_summary.stations_scored;
            summary.stations_failed += straggler_summary.stations_failed;
            summary.cancelled |= straggler_summary.cancelled;
        }

        Ok(summary)
    }

    /// Analysis-only processing of one day
    pub async fn analyze_day(
        &self,
        date: NaiveDate,
        codes: &[String],
        cancel: &CancellationToken,
    ) -> QcResult<RunSummary> {
        let mut targets = db::stations_with_details(&self.pool, date, 1).await?;
        if !codes.is_empty() {
            targets.retain(|code| codes.contains(code));
        }

        let mut summary = self.score_persisted(date, targets, cancel).await;
        summary.days = 1;
        Ok(summary)
    }

    async fn score_persisted(&self, date: NaiveDate, codes: Vec<String>, cancel: &CancellationToken) -> RunSummary {
        let outcomes: Vec<StationOutcome> = stream::iter(codes)
            .map(|code| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return StationOutcome::Cancelled;
                    }
                    match self.analyze_station(&code, date).await {
                        Ok(_) => StationOutcome::Scored { defaulted: 0 },
                        Err(e) => {
                            error!(station = %code, date = %date, error = %e, "Station analysis failed");
                            StationOutcome::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.worker_count)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome {
                StationOutcome::Scored { .. } => summary.stations_scored += 1,
                StationOutcome::Failed => summary.stations_failed += 1,
                StationOutcome::Cancelled => summary.cancelled = true,
            }
        }
        summary
    }

    /// Compute, persist and score all channels of one station-day
    ///
    /// Returns the verdict and the number of channels that fell back to
    /// default metrics.
    pub async fn process_station(&self, station: &Station, day: &DayWindow) -> QcResult<(StationQuality, usize)> {
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            QcError::InvalidInput("Channel processing needs a waveform source".to_string())
        })?;

        info!(
            station = %station.code,
            network = %station.network,
            date = %day.date,
            components = ?station.channel_components,
            "Station processing started"
        );

        // Channel metrics are joined before aggregation
        let outcomes = join_all(
            station
                .channel_components
                .iter()
                .map(|component| pipeline.process(station, component, day)),
        )
        .await;

        let mut metrics: Vec<ComponentMetrics> = Vec::with_capacity(outcomes.len());
        let mut defaulted = 0;
        for outcome in outcomes {
            if outcome.status != ChannelStatus::Complete {
                defaulted += 1;
            }
            db::upsert_qc_detail(&self.pool, &station.code, day.date, &outcome.metrics).await?;
            metrics.push(outcome.metrics);
        }

        let quality = self.analyzer.analyze(&station.code, day.date, &metrics);
        db::replace_station_quality(&self.pool, &quality).await?;

        Ok((quality, defaulted))
    }

    /// Score a station-day from its persisted metrics
    pub async fn analyze_station(&self, code: &str, date: NaiveDate) -> QcResult<StationQuality> {
        let metrics = db::load_qc_details(&self.pool, code, date).await?;
        debug!(station = %code, date = %date, channels = metrics.len(), "Loaded persisted metrics");

        let quality = self.analyzer.analyze(code, date, &metrics);
        db::replace_station_quality(&self.pool, &quality).await?;
        Ok(quality)
    }
}

//! Channel pipeline: waveform → ComponentMetrics
//!
//! Fetch → basic metrics → spectral estimate → noise-model summary and
//! dead-channel indicators. A failure at any stage degrades to default
//! values instead of failing the station:
//! - no waveform: dead defaults (availability 0, one gap, 100% above NHNM)
//! - too many gaps or no spectrum: basic metrics kept, spectral defaults

use crate::db::Station;
use crate::models::{ComponentMetrics, Trace};
use crate::services::dead_channel;
use crate::services::metric_extractor::{BasicMetrics, MetricExtractor};
use crate::services::spectral_summary::{self, round2};
use crate::workflow::sources::{SpectralEstimator, WaveformSource};
use sqes_common::DayWindow;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Gap count above which spectral processing is skipped
pub const DEFAULT_MAX_GAP_COUNT: u32 = 2000;

/// How a channel's metrics were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// All metrics computed
    Complete,
    /// Source had no data for any channel prefix
    NoData,
    /// Every fetch attempt failed
    AcquisitionFailed,
    /// Gap count over the limit, spectral metrics defaulted
    HighGap,
    /// No spectral curves, spectral metrics defaulted
    SpectralUnavailable,
}

/// Result of processing one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutcome {
    pub metrics: ComponentMetrics,
    pub status: ChannelStatus,
}

/// Metrics with basic values filled in and spectral values defaulted
fn basic_only(channel: &str, basic: &BasicMetrics) -> ComponentMetrics {
    ComponentMetrics {
        rms: round2(basic.rms),
        amplitude_ratio: round2(basic.amplitude_ratio),
        availability: round2(basic.availability),
        num_gap: basic.num_gap,
        num_overlap: basic.num_overlap,
        num_spikes: basic.num_spikes,
        ..ComponentMetrics::missing(channel)
    }
}

/// Processes one channel-day
pub struct ChannelPipeline {
    source: Arc<dyn WaveformSource>,
    estimator: Arc<dyn SpectralEstimator>,
    extractor: Arc<MetricExtractor>,
    max_gap_count: u32,
}

impl ChannelPipeline {
    pub fn new(
        source: Arc<dyn WaveformSource>,
        estimator: Arc<dyn SpectralEstimator>,
        extractor: MetricExtractor,
    ) -> Self {
        Self {
            source,
            estimator,
            extractor: Arc::new(extractor),
            max_gap_count: DEFAULT_MAX_GAP_COUNT,
        }
    }

    pub fn with_max_gap_count(mut self, max_gap_count: u32) -> Self {
        self.max_gap_count = max_gap_count;
        self
    }

    /// Metrics of `component` (e.g. `Z`) of `station` on `day`
    ///
    /// Channel prefixes are tried in order; the first one with data wins.
    pub async fn process(&self, station: &Station, component: &str, day: &DayWindow) -> ChannelOutcome {
        let mut failures = 0usize;
        let mut found: Option<Trace> = None;

        for prefix in &station.channel_prefixes {
            let channel = format!("{}{}", prefix, component);
            match self.source.fetch(station, &channel, day).await {
                Ok(Some(trace)) if !trace.is_empty() => {
                    debug!(trace = %trace.id(), "Waveform acquired");
                    found = Some(trace);
                    break;
                }
                Ok(_) => debug!(station = %station.code, channel = %channel, "No data"),
                Err(e) => {
                    failures += 1;
                    warn!(station = %station.code, channel = %channel, error = %e, "Waveform acquisition failed");
                }
            }
        }

        let Some(trace) = found else {
            let status = if failures > 0 && failures == station.channel_prefixes.len() {
                ChannelStatus::AcquisitionFailed
            } else {
                ChannelStatus::NoData
            };
            let channel = station.default_channel(component);
            info!(station = %station.code, channel = %channel, ?status, "Using default metrics");
            return ChannelOutcome {
                metrics: ComponentMetrics::missing(channel),
                status,
            };
        };

        let channel = trace.channel.clone();
        let extractor = Arc::clone(&self.extractor);
        let estimator = Arc::clone(&self.estimator);
        let max_gap_count = self.max_gap_count;
        let day = *day;

        // Spike detection and spectral estimation are CPU-bound
        let joined = tokio::task::spawn_blocking(move || {
            compute_metrics(&trace, &day, &extractor, estimator.as_ref(), max_gap_count)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(station = %station.code, channel = %channel, error = %e, "Metric computation task failed");
                ChannelOutcome {
                    metrics: ComponentMetrics::missing(channel),
                    status: ChannelStatus::AcquisitionFailed,
                }
            }
        }
    }
}

/// Synchronous part of the pipeline for one acquired trace
pub fn compute_metrics(
    trace: &Trace,
    day: &DayWindow,
    extractor: &MetricExtractor,
    estimator: &dyn SpectralEstimator,
    max_gap_count: u32,
) -> ChannelOutcome {
    let basic = extractor.extract(trace, day);
    let mut metrics = basic_only(&trace.channel, &basic);

    if basic.num_gap > max_gap_count {
        warn!(trace = %trace.id(), num_gap = basic.num_gap, "High gap count, skipping spectral metrics");
        return ChannelOutcome {
            metrics,
            status: ChannelStatus::HighGap,
        };
    }

    let curves = match estimator.estimate(trace, day) {
        Ok(Some(curves)) => curves,
        Ok(None) => {
            warn!(trace = %trace.id(), "No spectral curves, using spectral defaults");
            return ChannelOutcome {
                metrics,
                status: ChannelStatus::SpectralUnavailable,
            };
        }
        Err(e) => {
            error!(trace = %trace.id(), error = %e, "Spectral estimation failed");
            return ChannelOutcome {
                metrics,
                status: ChannelStatus::SpectralUnavailable,
            };
        }
    };

    if !curves.is_aligned() {
        warn!(trace = %trace.id(), "Spectral curves and noise models differ in length");
    }

    let summary = spectral_summary::summarize(&curves);
    let dead = dead_channel::detect(&curves);

    metrics.pct_above_nhnm = summary.pct_above_nhnm;
    metrics.pct_below_nlnm = summary.pct_below_nlnm;
    metrics.band_percentages = summary.band_percentages;
    metrics.dcl = round2(dead.dcl);
    metrics.dcg = dead.dcg;

    debug!(
        trace = %trace.id(),
        pct_above = metrics.pct_above_nhnm,
        pct_below = metrics.pct_below_nlnm,
        dcl = metrics.dcl,
        dcg = metrics.dcg,
        "Spectral metrics computed"
    );

    ChannelOutcome {
        metrics,
        status: ChannelStatus::Complete,
    }
}

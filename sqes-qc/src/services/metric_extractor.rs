//! Basic waveform metrics for one channel-day
//!
//! Everything here is pure arithmetic over a [`Trace`]: RMS, amplitude
//! ratio, availability against the processing day, gap/overlap counts and
//! spike counts. Spectral metrics are derived separately.

use crate::models::{Trace, TraceSegment};
use crate::services::spike_detector::SpikeDetector;
use sqes_common::DayWindow;
use tracing::debug;

/// Upper bound stored for RMS and amplitude ratio
pub const METRIC_CAP: f64 = 99_999.0;

/// Denominator floor for the amplitude ratio
const RATIO_EPSILON: f64 = f64::EPSILON;

/// Time-domain metrics of one channel-day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicMetrics {
    pub rms: f64,
    pub amplitude_ratio: f64,
    /// Percent of the day covered, 0–100
    pub availability: f64,
    pub num_gap: u32,
    pub num_overlap: u32,
    pub num_spikes: u32,
}

/// Extracts [`BasicMetrics`] from traces
#[derive(Debug, Clone, Default)]
pub struct MetricExtractor {
    spikes: SpikeDetector,
}

impl MetricExtractor {
    pub fn new(spikes: SpikeDetector) -> Self {
        Self { spikes }
    }

    /// Compute all basic metrics for `trace` within `day`
    pub fn extract(&self, trace: &Trace, day: &DayWindow) -> BasicMetrics {
        let (num_gap, num_overlap) = discontinuities(trace);

        let num_spikes = trace
            .segments
            .iter()
            .map(|segment| self.spikes.count(&segment.samples))
            .fold(0u32, u32::saturating_add);

        let metrics = BasicMetrics {
            rms: rms(trace),
            amplitude_ratio: amplitude_ratio(trace),
            availability: availability(trace, day),
            num_gap,
            num_overlap,
            num_spikes,
        };

        debug!(
            trace = %trace.id(),
            segments = trace.segments.len(),
            rms = metrics.rms,
            availability = metrics.availability,
            num_gap,
            num_overlap,
            num_spikes,
            "Extracted basic metrics"
        );

        metrics
    }
}

fn finite_samples(trace: &Trace) -> impl Iterator<Item = f64> + '_ {
    trace
        .segments
        .iter()
        .flat_map(|s| s.samples.iter().copied())
        .filter(|v| v.is_finite())
}

/// Root mean square over all finite samples (0 without samples)
pub fn rms(trace: &Trace) -> f64 {
    let (sum_sq, count) = finite_samples(trace).fold((0.0f64, 0usize), |(sum, n), v| (sum + v * v, n + 1));

    if count == 0 {
        return 0.0;
    }

    (sum_sq / count as f64).sqrt().min(METRIC_CAP)
}

/// Largest over smallest non-zero absolute amplitude
///
/// No samples gives 0, an all-zero trace gives 1.
pub fn amplitude_ratio(trace: &Trace) -> f64 {
    let mut max_abs: Option<f64> = None;
    let mut min_nonzero: Option<f64> = None;

    for value in finite_samples(trace) {
        let abs = value.abs();
        max_abs = Some(max_abs.map_or(abs, |m| m.max(abs)));
        if abs > 0.0 {
            min_nonzero = Some(min_nonzero.map_or(abs, |m| m.min(abs)));
        }
    }

    match (max_abs, min_nonzero) {
        (None, _) => 0.0,
        (Some(_), None) => 1.0,
        (Some(max), Some(min)) => (max / min.max(RATIO_EPSILON)).min(METRIC_CAP),
    }
}

/// Percent of `day` covered by samples, overlaps counted once
pub fn availability(trace: &Trace, day: &DayWindow) -> f64 {
    let day_seconds = day.duration_seconds();
    if day_seconds <= 0.0 || trace.nominal_sampling_rate().is_none() {
        return 0.0;
    }

    let mut intervals: Vec<(f64, f64)> = trace
        .segments
        .iter()
        .filter(|s| s.sampling_rate > 0.0 && !s.samples.is_empty())
        .map(|s| {
            let start = day.offset_seconds(s.start);
            let end = start + s.samples.len() as f64 / s.sampling_rate;
            (start.max(0.0), end.min(day_seconds))
        })
        .filter(|(start, end)| end > start)
        .collect();

    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut covered = 0.0;
    let mut current: Option<(f64, f64)> = None;
    for (start, end) in intervals {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                covered += cur_end - cur_start;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((cur_start, cur_end)) = current {
        covered += cur_end - cur_start;
    }

    (100.0 * covered / day_seconds).clamp(0.0, 100.0)
}

/// Count gaps and overlaps between consecutive segments
///
/// The discontinuity is the distance between a segment's start and the time
/// the previous segment's next sample was due. Only breaks larger than one
/// sample period count.
pub fn discontinuities(trace: &Trace) -> (u32, u32) {
    let mut segments: Vec<&TraceSegment> = trace
        .segments
        .iter()
        .filter(|s| s.sampling_rate > 0.0 && !s.samples.is_empty())
        .collect();
    segments.sort_by_key(|s| s.start);

    let mut gaps = 0u32;
    let mut overlaps = 0u32;

    for pair in segments.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let dt = prev.sample_interval();
        let offset = (next.start - prev.start)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0);
        let discontinuity = offset - (prev.span_seconds() + dt);

        if discontinuity > dt {
            gaps += 1;
        } else if discontinuity < -dt {
            overlaps += 1;
        }
    }

    (gaps, overlaps)
}

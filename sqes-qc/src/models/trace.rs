//! Waveform traces
//!
//! A channel-day arrives as one or more contiguous segments. Breaks between
//! segments are the gaps and overlaps of the recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contiguous run of equally spaced samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSegment {
    /// Time of the first sample
    pub start: DateTime<Utc>,
    /// Samples per second
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
}

impl TraceSegment {
    pub fn new(start: DateTime<Utc>, sampling_rate: f64, samples: Vec<f64>) -> Self {
        Self {
            start,
            sampling_rate,
            samples,
        }
    }

    /// Seconds between samples (0 for an invalid rate)
    pub fn sample_interval(&self) -> f64 {
        if self.sampling_rate > 0.0 {
            1.0 / self.sampling_rate
        } else {
            0.0
        }
    }

    /// Seconds from the first to the last sample
    pub fn span_seconds(&self) -> f64 {
        self.samples.len().saturating_sub(1) as f64 * self.sample_interval()
    }
}

/// All segments of one channel for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub network: String,
    pub station: String,
    #[serde(default)]
    pub location: String,
    /// SEED channel code (e.g. `BHZ`)
    pub channel: String,
    pub segments: Vec<TraceSegment>,
}

impl Trace {
    /// `NET.STA.LOC.CHA` identifier used in log messages
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }

    /// Total number of samples across all segments
    pub fn sample_count(&self) -> usize {
        self.segments.iter().map(|s| s.samples.len()).sum()
    }

    /// Sampling rate of the first usable segment
    pub fn nominal_sampling_rate(&self) -> Option<f64> {
        self.segments
            .iter()
            .map(|s| s.sampling_rate)
            .find(|rate| *rate > 0.0 && rate.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }
}

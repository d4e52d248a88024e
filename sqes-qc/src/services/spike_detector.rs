//! Spike detection with a rolling median / MAD baseline
//!
//! A sample is a spike when its distance from the median of the window
//! centred on it exceeds `1.4826 * sigma * MAD + 1e-9`, where MAD is the
//! median absolute deviation of that window (1.4826 scales MAD to a normal
//! standard deviation).
//!
//! Two strategies share the same per-window arithmetic and therefore return
//! the same count for the same input:
//! - [`SpikeMethod::Fast`]: whole-array, data-parallel over all window
//!   centres; holds every window's statistics in memory at once.
//! - [`SpikeMethod::Efficient`]: one reusable window buffer, streaming.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Consistency constant converting MAD to a standard-deviation estimate
const MAD_SCALE: f64 = 1.4826;

/// Keeps the threshold positive on perfectly flat windows
const THRESHOLD_FLOOR: f64 = 1e-9;

/// Spike detection errors
#[derive(Debug, Error)]
pub enum SpikeError {
    /// Invalid window length
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Invalid sigma multiplier
    #[error("Invalid sigma: {0}")]
    InvalidSigma(String),
}

/// Spike counting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeMethod {
    /// Parallel, higher peak memory
    #[default]
    Fast,
    /// Sequential, constant extra memory
    Efficient,
}

/// Median and MAD of one window
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowStats {
    median: f64,
    mad: f64,
}

/// Rolling median / MAD spike detector
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    /// Requested window length in samples (default: 80)
    window: usize,

    /// Threshold multiplier on the scaled MAD (default: 10)
    sigma: f64,

    method: SpikeMethod,
}

impl SpikeDetector {
    /// Create new spike detector with defaults
    pub fn new() -> Self {
        Self {
            window: 80,
            sigma: 10.0,
            method: SpikeMethod::Fast,
        }
    }

    /// Set window length (made odd internally)
    pub fn with_window(mut self, window: usize) -> Result<Self, SpikeError> {
        if window < 2 {
            return Err(SpikeError::InvalidWindow(
                "Window must be at least 2 samples".to_string(),
            ));
        }
        self.window = window;
        Ok(self)
    }

    /// Set threshold multiplier
    pub fn with_sigma(mut self, sigma: f64) -> Result<Self, SpikeError> {
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(SpikeError::InvalidSigma(format!(
                "Sigma must be a positive number (got {})",
                sigma
            )));
        }
        self.sigma = sigma;
        Ok(self)
    }

    pub fn with_method(mut self, method: SpikeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> SpikeMethod {
        self.method
    }

    /// Count spikes in one contiguous run of samples
    ///
    /// Runs shorter than twice the window are skipped (count 0). Only centres
    /// with a fully populated window are evaluated, and windows containing
    /// non-finite samples are ignored.
    pub fn count(&self, samples: &[f64]) -> u32 {
        if samples.len() < self.window * 2 {
            return 0;
        }

        let count = match self.method {
            SpikeMethod::Fast => self.count_fast(samples),
            SpikeMethod::Efficient => self.count_efficient(samples),
        };

        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Odd window length actually used
    fn odd_window(&self) -> usize {
        if self.window % 2 == 0 {
            self.window + 1
        } else {
            self.window
        }
    }

    fn count_fast(&self, samples: &[f64]) -> usize {
        let width = self.odd_window();
        let half = width / 2;
        let centres = half..samples.len() - half;

        let stats: Vec<Option<WindowStats>> = centres
            .clone()
            .into_par_iter()
            .map_init(
                || Vec::with_capacity(width),
                |scratch, i| window_stats(&samples[i - half..=i + half], scratch),
            )
            .collect();

        centres
            .zip(stats)
            .filter(|(i, stats)| self.is_spike(samples[*i], *stats))
            .count()
    }

    fn count_efficient(&self, samples: &[f64]) -> usize {
        let width = self.odd_window();
        let half = width / 2;
        let mut scratch = Vec::with_capacity(width);

        (half..samples.len() - half)
            .filter(|&i| {
                let stats = window_stats(&samples[i - half..=i + half], &mut scratch);
                self.is_spike(samples[i], stats)
            })
            .count()
    }

    fn is_spike(&self, sample: f64, stats: Option<WindowStats>) -> bool {
        match stats {
            Some(stats) => {
                let threshold = MAD_SCALE * self.sigma * stats.mad + THRESHOLD_FLOOR;
                (sample - stats.median).abs() > threshold
            }
            None => false,
        }
    }
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Median and MAD of an odd-length window, `None` if it holds non-finite values
fn window_stats(window: &[f64], scratch: &mut Vec<f64>) -> Option<WindowStats> {
    if window.is_empty() || window.iter().any(|v| !v.is_finite()) {
        return None;
    }

    scratch.clear();
    scratch.extend_from_slice(window);
    let mid = scratch.len() / 2;

    let median = *scratch.select_nth_unstable_by(mid, f64::total_cmp).1;

    for value in scratch.iter_mut() {
        *value = (*value - median).abs();
    }
    let mad = *scratch.select_nth_unstable_by(mid, f64::total_cmp).1;

    Some(WindowStats { median, mad })
}

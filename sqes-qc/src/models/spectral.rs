//! Spectral curves handed over by a spectral estimator

use serde::{Deserialize, Serialize};

/// PSD curves of one channel-day plus the noise models at the same periods
///
/// `psd_percentile`, `nhnm` and `nlnm` are aligned with `periods`. The mean
/// curve has its own period axis. All PSD values are in dB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralCurves {
    /// Periods (s) of the percentile curve, ascending
    pub periods: Vec<f64>,
    pub psd_percentile: Vec<f64>,
    /// Peterson high noise model at `periods`
    pub nhnm: Vec<f64>,
    /// Peterson low noise model at `periods`
    pub nlnm: Vec<f64>,
    /// Periods (s) of the mean curve
    pub mean_periods: Vec<f64>,
    pub psd_mean: Vec<f64>,
    /// Sampling rate (Hz) of the underlying trace
    pub sampling_rate: f64,
}

impl SpectralCurves {
    /// True when the percentile curve and both models line up point for point
    pub fn is_aligned(&self) -> bool {
        let n = self.periods.len();
        self.psd_percentile.len() == n
            && self.nhnm.len() == n
            && self.nlnm.len() == n
            && self.mean_periods.len() == self.psd_mean.len()
    }
}

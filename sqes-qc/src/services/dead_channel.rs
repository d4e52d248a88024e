//! Dead-channel detection
//!
//! Two independent indicators that a sensor is not transducing ground
//! motion:
//! - **DCL**: residual RMSE of a straight line fitted to the mean PSD
//!   against log10(period). A live sensor has a structured spectrum and a
//!   large residual; a dead one is nearly straight.
//! - **DCG**: flag raised when the percentile PSD sits more than 5 dB below
//!   the low noise model on average in the 4–8 s band.

use crate::models::SpectralCurves;
use tracing::debug;

/// Upper period bound (s) of the DCL fit
const DCL_MAX_PERIOD: f64 = 100.0;

/// DCG period band (s), exclusive
const DCG_BAND: (f64, f64) = (4.0, 8.0);

/// Mean dB below the low noise model that flags a dead channel
const DCG_DEVIATION_DB: f64 = 5.0;

/// Dead-channel indicators of one channel-day
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadChannelMetrics {
    pub dcl: f64,
    /// 0 or 1
    pub dcg: u8,
}

/// Linear dead-channel metric
///
/// Fits over `4/fs < T < 100`. Returns 0 when `fs <= 0` or fewer than two
/// points fall in range.
pub fn dead_channel_lin(psd_mean: &[f64], periods: &[f64], sampling_rate: f64) -> f64 {
    if sampling_rate <= 0.0 {
        debug!(sampling_rate, "Invalid sampling rate, DCL not computed");
        return 0.0;
    }

    let t0 = 4.0 / sampling_rate;
    let points: Vec<(f64, f64)> = periods
        .iter()
        .zip(psd_mean)
        .filter(|(t, psd)| **t > t0 && **t < DCL_MAX_PERIOD && psd.is_finite())
        .map(|(t, psd)| (t.log10(), *psd))
        .collect();

    if points.len() < 2 {
        debug!(points = points.len(), "Not enough points for DCL fit");
        return 0.0;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let mse = points
        .iter()
        .map(|(x, y)| (slope * x + intercept - y).powi(2))
        .sum::<f64>()
        / n;

    mse.sqrt()
}

/// GSN dead-channel flag
///
/// 1 when `mean(NLNM - PSD) > 5 dB` over `4 < T < 8`, else 0. No periods in
/// the band gives 0.
pub fn dead_channel_gsn(psd: &[f64], nlnm: &[f64], periods: &[f64]) -> u8 {
    let (t0, t1) = DCG_BAND;
    let deviations: Vec<f64> = psd
        .iter()
        .zip(nlnm)
        .zip(periods)
        .filter(|(_, t)| **t > t0 && **t < t1)
        .map(|((value, low), _)| low - value)
        .collect();

    if deviations.is_empty() {
        return 0;
    }

    let mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
    u8::from(mean > DCG_DEVIATION_DB)
}

/// Both indicators from one set of curves
pub fn detect(curves: &SpectralCurves) -> DeadChannelMetrics {
    DeadChannelMetrics {
        dcl: dead_channel_lin(&curves.psd_mean, &curves.mean_periods, curves.sampling_rate),
        dcg: dead_channel_gsn(&curves.psd_percentile, &curves.nlnm, &curves.periods),
    }
}

//! Noise-model percentages of a PSD curve
//!
//! Compares the percentile PSD against the Peterson models point by point.
//! Values are percentages of curve points, rounded to two decimals as they
//! are stored.

use crate::models::{BandPercentages, SpectralCurves};

/// Long-period band (s), exclusive bounds
pub const LONG_PERIOD_BAND: (f64, f64) = (20.0, 900.0);
/// Body-wave / microseism band (s)
pub const BODY_WAVE_BAND: (f64, f64) = (2.0, 25.0);
/// Short-period band (s)
pub const SHORT_PERIOD_BAND: (f64, f64) = (0.1, 1.0);

/// Noise-model percentages of one channel-day
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralSummary {
    pub pct_above_nhnm: f64,
    pub pct_below_nlnm: f64,
    pub band_percentages: BandPercentages,
}

/// Round to two decimals, correctly rounded with ties to even
///
/// Decides on the exact binary value rather than the scaled product, so
/// 2.675 (stored just below the tie) goes to 2.67 and an exact 0.125 goes
/// to 0.12.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }

    let floor = scaled.floor();
    let rounded = if scaled - floor == 0.5 {
        // error of the scaled product, exact under fma
        let residual = value.mul_add(100.0, -scaled);
        if residual > 0.0 {
            floor + 1.0
        } else if residual < 0.0 || floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };

    rounded / 100.0
}

/// Percent of points above the high model and below the low model
///
/// Returns `(above, below)`; an empty curve gives `(0, 0)`.
pub fn percentage_outside_models(psd: &[f64], nhnm: &[f64], nlnm: &[f64]) -> (f64, f64) {
    let mut total = 0usize;
    let mut above = 0usize;
    let mut below = 0usize;

    for ((value, high), low) in psd.iter().zip(nhnm).zip(nlnm) {
        total += 1;
        if value > high {
            above += 1;
        }
        if value < low {
            below += 1;
        }
    }

    if total == 0 {
        return (0.0, 0.0);
    }

    (
        round2(above as f64 * 100.0 / total as f64),
        round2(below as f64 * 100.0 / total as f64),
    )
}

/// Percent of points inside the models for periods strictly within `band`
pub fn percentage_inside_models(
    psd: &[f64],
    nlnm: &[f64],
    nhnm: &[f64],
    periods: &[f64],
    band: (f64, f64),
) -> f64 {
    let (t0, t1) = band;
    let mut total = 0usize;
    let mut inside = 0usize;

    for (((value, low), high), period) in psd.iter().zip(nlnm).zip(nhnm).zip(periods) {
        if *period > t0 && *period < t1 {
            total += 1;
            if value <= high && value >= low {
                inside += 1;
            }
        }
    }

    if total == 0 {
        return 0.0;
    }

    round2(inside as f64 * 100.0 / total as f64)
}

/// Derive every noise-model percentage from `curves`
pub fn summarize(curves: &SpectralCurves) -> SpectralSummary {
    let (pct_above_nhnm, pct_below_nlnm) =
        percentage_outside_models(&curves.psd_percentile, &curves.nhnm, &curves.nlnm);

    let inside = |band| {
        percentage_inside_models(
            &curves.psd_percentile,
            &curves.nlnm,
            &curves.nhnm,
            &curves.periods,
            band,
        )
    };

    SpectralSummary {
        pct_above_nhnm,
        pct_below_nlnm,
        band_percentages: BandPercentages {
            sp: inside(SHORT_PERIOD_BAND),
            bw: inside(BODY_WAVE_BAND),
            lp: inside(LONG_PERIOD_BAND),
        },
    }
}

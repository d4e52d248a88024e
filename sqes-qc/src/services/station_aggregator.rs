//! Station score from the three channel scores
//!
//! The station score is the lower quartile of the E/N/Z scores, so a
//! station is never rated much above its weakest channel. When any channel
//! was forced to the "unresponsive"/"damaged" value of 1, the score is
//! additionally capped at the poor floor (59).

use crate::models::{Classification, ComponentScore, QcThresholds};

/// Value marking an unresponsive or damaged channel
const CRITICAL_SCORE: f64 = 1.0;

/// Percentile with linear interpolation between order statistics
///
/// Index `q/100 * (n-1)` into the sorted values, interpolating between the
/// neighbouring order statistics. Empty input gives 0.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Aggregated station score and its classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationScore {
    pub score: f64,
    pub classification: Classification,
    /// True when the critical-channel cap lowered the score
    pub capped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StationAggregator {
    thresholds: QcThresholds,
}

impl StationAggregator {
    pub fn new(thresholds: QcThresholds) -> Self {
        Self { thresholds }
    }

    /// Combine exactly three channel scores (E, N, Z)
    pub fn aggregate(&self, scores: &[ComponentScore; 3]) -> StationScore {
        let values: Vec<f64> = scores.iter().map(|s| s.value).collect();
        let quartile = percentile(&values, self.thresholds.station_percentile);

        let has_critical = values.iter().any(|v| *v == CRITICAL_SCORE);
        let score = if has_critical {
            quartile.min(self.thresholds.poor_floor_score)
        } else {
            quartile
        };

        StationScore {
            score,
            classification: Classification::from_score(score),
            capped: score < quartile,
        }
    }
}

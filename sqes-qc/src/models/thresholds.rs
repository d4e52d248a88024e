//! Grading thresholds
//!
//! Limits and margins follow the 90th-percentile values of Ringler et al.
//! (2015) and the QuARG gap convention. A `QcThresholds` value is immutable
//! once built and is handed to every scoring component, so differently
//! configured engines (e.g. per network) can run side by side.
//!
//! Every field has a serde default, so a TOML `[thresholds]` section only
//! needs the values it overrides.

use serde::{Deserialize, Serialize};
use sqes_common::{Error, Result};

/// Limit and degradation margin for one graded metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeLimit {
    /// Values at or below the limit grade 100
    pub limit: f64,
    /// Each margin above the limit costs 15 points
    pub margin: f64,
}

impl GradeLimit {
    pub const fn new(limit: f64, margin: f64) -> Self {
        Self { limit, margin }
    }
}

/// Weights of the per-channel weighted formula (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub noise: f64,
    pub availability: f64,
    pub rms: f64,
    pub amplitude_ratio: f64,
    pub gaps: f64,
    pub overlaps: f64,
    pub spikes: f64,
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.noise
            + self.availability
            + self.rms
            + self.amplitude_ratio
            + self.gaps
            + self.overlaps
            + self.spikes
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            noise: 0.35,
            availability: 0.15,
            rms: 0.10,
            amplitude_ratio: 0.10,
            gaps: 0.10,
            overlaps: 0.10,
            spikes: 0.10,
        }
    }
}

/// Complete grading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcThresholds {
    // Graded metrics
    pub rms: GradeLimit,
    pub amplitude_ratio: GradeLimit,
    pub gaps: GradeLimit,
    pub overlaps: GradeLimit,
    pub spikes: GradeLimit,
    pub weights: ScoreWeights,

    // Override rules
    /// DCL at or below this marks the channel unresponsive (QuARG)
    pub dcl_dead: f64,
    /// RMS strictly between 0 and this marks the channel damaged
    pub rms_damaged_max: f64,

    // Availability floors
    /// Availability at or above this is considered complete
    pub avail_good: f64,
    /// Lower bound of the "fair" floor band
    pub avail_fair_floor: f64,
    /// Floor applied in the fair band
    pub fair_floor_score: f64,
    /// Floor applied below the fair band (and cap for unresponsive stations)
    pub poor_floor_score: f64,

    // Station aggregation
    /// Percentile of the three channel scores used as station score
    pub station_percentile: f64,

    // Warning conditions
    pub pct_below_warn: f64,
    pub pct_above_warn: f64,
    pub gap_count_warn: u32,
    pub overlap_count_warn: u32,
    pub spike_count_warn: u32,
    /// Availability below `avail_good` but at or above this is "low"
    pub avail_low_warn: f64,
    /// Noise warnings need at least this much availability
    pub avail_min_for_noise_check: f64,
}

impl Default for QcThresholds {
    fn default() -> Self {
        Self {
            rms: GradeLimit::new(5000.0, 7500.0),
            amplitude_ratio: GradeLimit::new(1.01, 2.02),
            gaps: GradeLimit::new(0.00274, 0.992),
            overlaps: GradeLimit::new(0.0, 1.25),
            spikes: GradeLimit::new(0.0, 25.0),
            weights: ScoreWeights::default(),
            dcl_dead: 2.25,
            rms_damaged_max: 1.0,
            avail_good: 97.0,
            avail_fair_floor: 50.0,
            fair_floor_score: 89.0,
            poor_floor_score: 59.0,
            station_percentile: 25.0,
            pct_below_warn: 20.0,
            pct_above_warn: 20.0,
            gap_count_warn: 5,
            overlap_count_warn: 5,
            spike_count_warn: 25,
            avail_low_warn: 80.0,
            avail_min_for_noise_check: 10.0,
        }
    }
}

impl QcThresholds {
    /// Reject configurations the grader cannot evaluate meaningfully
    pub fn validate(&self) -> Result<()> {
        let total = self.weights.total();
        if (total - 1.0).abs() > 1e-9 {
            return Err(Error::Config(format!(
                "Score weights must sum to 1.0 (got {})",
                total
            )));
        }

        let graded = [
            ("rms", self.rms),
            ("amplitude_ratio", self.amplitude_ratio),
            ("gaps", self.gaps),
            ("overlaps", self.overlaps),
            ("spikes", self.spikes),
        ];
        for (name, grade) in graded {
            if grade.margin == 0.0 || !grade.margin.is_finite() || !grade.limit.is_finite() {
                return Err(Error::Config(format!(
                    "Invalid grading limit for {}: limit={}, margin={}",
                    name, grade.limit, grade.margin
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.station_percentile) {
            return Err(Error::Config(format!(
                "station_percentile must be within 0-100 (got {})",
                self.station_percentile
            )));
        }

        if self.avail_fair_floor > self.avail_good {
            return Err(Error::Config(format!(
                "avail_fair_floor ({}) must not exceed avail_good ({})",
                self.avail_fair_floor, self.avail_good
            )));
        }

        Ok(())
    }
}

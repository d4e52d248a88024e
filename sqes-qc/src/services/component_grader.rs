//! Per-channel quality score
//!
//! # Scoring Algorithm
//! Override rules are checked top to bottom, first match wins:
//! 1. **Dead**: availability ≤ 0 → 0
//! 2. **Unresponsive**: DCG flag set or DCL ≤ 2.25 → 1
//! 3. **Damaged**: 0 < RMS < 1 → 1
//!
//! Otherwise the weighted formula applies:
//! - Noise level (35%): `100 - pct_above_nhnm - pct_below_nlnm`
//! - Availability (15%)
//! - RMS, amplitude ratio, gaps, overlaps, spikes (10% each), each graded by
//!   `clamp(100 - 15 * (p - limit) / margin, 0, 100)`
//!
//! followed by the availability floors: 50 ≤ availability < 97 lifts the
//! score to at least 89, 0 < availability < 50 lifts it to at least 59.

use crate::models::{ComponentMetrics, ComponentScore, QcThresholds, ScoreRule};
use tracing::debug;

/// Score of a metric sitting exactly at its limit
const FULL_GRADE: f64 = 100.0;

/// Points lost per margin above the limit
const MARGIN_PENALTY: f64 = 15.0;

/// Grade one parameter against its limit
///
/// Saturates at 100 for `parameter <= limit` and at 0 far above it. A
/// non-numeric result grades 0.
pub fn grade(parameter: f64, limit: f64, margin: f64) -> f64 {
    let raw = FULL_GRADE - MARGIN_PENALTY * (parameter - limit) / margin;
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, FULL_GRADE)
}

/// Hard override evaluated before the weighted formula
#[derive(Debug, Clone, Copy)]
pub struct OverrideRule {
    pub kind: ScoreRule,
    pub score: f64,
    pub applies: fn(&ComponentMetrics, &QcThresholds) -> bool,
}

fn is_dead(metrics: &ComponentMetrics, _: &QcThresholds) -> bool {
    metrics.availability <= 0.0
}

fn is_unresponsive(metrics: &ComponentMetrics, thresholds: &QcThresholds) -> bool {
    metrics.dcg == 1 || metrics.dcl <= thresholds.dcl_dead
}

fn is_damaged(metrics: &ComponentMetrics, thresholds: &QcThresholds) -> bool {
    metrics.rms > 0.0 && metrics.rms < thresholds.rms_damaged_max
}

/// Override rules in priority order
pub const OVERRIDE_RULES: [OverrideRule; 3] = [
    OverrideRule {
        kind: ScoreRule::Dead,
        score: 0.0,
        applies: is_dead,
    },
    OverrideRule {
        kind: ScoreRule::Unresponsive,
        score: 1.0,
        applies: is_unresponsive,
    },
    OverrideRule {
        kind: ScoreRule::Damaged,
        score: 1.0,
        applies: is_damaged,
    },
];

/// Individual grades feeding the weighted formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBreakdown {
    pub noise: f64,
    pub availability: f64,
    pub rms: f64,
    pub amplitude_ratio: f64,
    pub gaps: f64,
    pub overlaps: f64,
    pub spikes: f64,
}

/// Channel grader bound to one threshold set
#[derive(Debug, Clone, Default)]
pub struct ComponentGrader {
    thresholds: QcThresholds,
}

impl ComponentGrader {
    pub fn new(thresholds: QcThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QcThresholds {
        &self.thresholds
    }

    /// First override rule matching `metrics`, if any
    pub fn matching_override(&self, metrics: &ComponentMetrics) -> Option<&'static OverrideRule> {
        OVERRIDE_RULES
            .iter()
            .find(|rule| (rule.applies)(metrics, &self.thresholds))
    }

    /// Score one channel
    pub fn score(&self, metrics: &ComponentMetrics) -> ComponentScore {
        if let Some(rule) = self.matching_override(metrics) {
            debug!(
                channel = %metrics.channel,
                rule = ?rule.kind,
                score = rule.score,
                "Override rule applied"
            );
            return ComponentScore::from_rule(rule.score, rule.kind);
        }

        let grades = self.breakdown(metrics);
        let weights = &self.thresholds.weights;

        let weighted = weights.noise * grades.noise
            + weights.availability * grades.availability
            + weights.rms * grades.rms
            + weights.amplitude_ratio * grades.amplitude_ratio
            + weights.gaps * grades.gaps
            + weights.overlaps * grades.overlaps
            + weights.spikes * grades.spikes;

        let value = self.apply_availability_floor(weighted, metrics.availability);

        debug!(
            channel = %metrics.channel,
            noise = grades.noise,
            rms_grade = grades.rms,
            ratio_grade = grades.amplitude_ratio,
            weighted,
            score = value,
            "Weighted score computed"
        );

        ComponentScore::from_rule(value, ScoreRule::Weighted)
    }

    /// Grades of every weighted term
    pub fn breakdown(&self, metrics: &ComponentMetrics) -> GradeBreakdown {
        let t = &self.thresholds;

        let rms = if metrics.rms > t.rms_damaged_max {
            grade(metrics.rms, t.rms.limit, t.rms.margin)
        } else {
            0.0
        };

        GradeBreakdown {
            noise: noise_level(metrics.pct_above_nhnm, metrics.pct_below_nlnm),
            availability: metrics.availability.clamp(0.0, 100.0),
            rms,
            amplitude_ratio: grade(
                metrics.amplitude_ratio,
                t.amplitude_ratio.limit,
                t.amplitude_ratio.margin,
            ),
            gaps: grade(f64::from(metrics.num_gap), t.gaps.limit, t.gaps.margin),
            overlaps: grade(
                f64::from(metrics.num_overlap),
                t.overlaps.limit,
                t.overlaps.margin,
            ),
            spikes: grade(f64::from(metrics.num_spikes), t.spikes.limit, t.spikes.margin),
        }
    }

    /// Floors are `max`, they can only raise a score
    fn apply_availability_floor(&self, score: f64, availability: f64) -> f64 {
        let t = &self.thresholds;
        if availability >= t.avail_fair_floor && availability < t.avail_good {
            score.max(t.fair_floor_score)
        } else if availability > 0.0 && availability < t.avail_fair_floor {
            score.max(t.poor_floor_score)
        } else {
            score
        }
    }
}

/// Share of the spectrum inside the noise models
pub fn noise_level(pct_above_nhnm: f64, pct_below_nlnm: f64) -> f64 {
    (100.0 - pct_above_nhnm - pct_below_nlnm).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandPercentages;

    fn nominal() -> ComponentMetrics {
        ComponentMetrics {
            channel: "BHZ".to_string(),
            rms: 200.0,
            amplitude_ratio: 1.5,
            availability: 100.0,
            num_gap: 0,
            num_overlap: 0,
            num_spikes: 0,
            pct_below_nlnm: 5.0,
            pct_above_nhnm: 3.0,
            band_percentages: BandPercentages::default(),
            dcl: 10.0,
            dcg: 0,
        }
    }

    #[test]
    fn test_grade_saturates_at_limit() {
        for margin in [0.5, 1.0, 25.0, 7500.0] {
            assert!((grade(3.0, 3.0, margin) - 100.0).abs() < 1e-12);
        }
        assert_eq!(grade(0.0, 5000.0, 7500.0), 100.0);
        assert_eq!(grade(1.0e9, 5000.0, 7500.0), 0.0);
    }

    #[test]
    fn test_grade_non_increasing() {
        let mut previous = f64::INFINITY;
        for step in 0..200 {
            let value = grade(step as f64 * 0.5, 1.01, 2.02);
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn test_grade_nan_is_zero() {
        assert_eq!(grade(f64::NAN, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_worked_example() {
        let grader = ComponentGrader::default();
        let metrics = nominal();

        let grades = grader.breakdown(&metrics);
        assert!((grades.noise - 92.0).abs() < 1e-12);
        assert_eq!(grades.rms, 100.0);
        assert!((grades.amplitude_ratio - 96.3614).abs() < 1e-3);
        assert_eq!(grades.gaps, 100.0);
        assert_eq!(grades.overlaps, 100.0);
        assert_eq!(grades.spikes, 100.0);

        let score = grader.score(&metrics);
        assert!(!score.overridden);
        assert_eq!(score.rule, ScoreRule::Weighted);
        assert!((score.value - 96.836).abs() < 1e-3, "score = {}", score.value);
    }

    #[test]
    fn test_dead_override_ignores_other_metrics() {
        let grader = ComponentGrader::default();
        for availability in [0.0, -5.0] {
            let mut metrics = nominal();
            metrics.availability = availability;
            metrics.dcg = 1;
            metrics.rms = 0.5;
            let score = grader.score(&metrics);
            assert_eq!(score.value, 0.0);
            assert_eq!(score.rule, ScoreRule::Dead);
            assert!(score.overridden);
        }
    }

    #[test]
    fn test_unresponsive_override() {
        let grader = ComponentGrader::default();

        let mut flagged = nominal();
        flagged.dcg = 1;
        assert_eq!(grader.score(&flagged).value, 1.0);

        let mut flat = nominal();
        flat.dcl = 2.25;
        let score = grader.score(&flat);
        assert_eq!(score.value, 1.0);
        assert_eq!(score.rule, ScoreRule::Unresponsive);

        flat.dcl = 2.26;
        assert!(grader.score(&flat).value > 1.0);
    }

    #[test]
    fn test_damaged_override() {
        let grader = ComponentGrader::default();
        let mut metrics = nominal();
        metrics.rms = 0.4;
        let score = grader.score(&metrics);
        assert_eq!(score.value, 1.0);
        assert_eq!(score.rule, ScoreRule::Damaged);

        // zero RMS is not "damaged", it is graded 0 instead
        metrics.rms = 0.0;
        assert_eq!(grader.score(&metrics).rule, ScoreRule::Weighted);
    }

    #[test]
    fn test_rms_at_or_below_one_grades_zero() {
        let grader = ComponentGrader::default();
        let mut metrics = nominal();
        metrics.rms = 1.0;
        assert_eq!(grader.breakdown(&metrics).rms, 0.0);
    }

    #[test]
    fn test_fair_availability_floor() {
        let grader = ComponentGrader::default();
        let mut metrics = nominal();
        metrics.availability = 60.0;
        metrics.pct_above_nhnm = 100.0;
        let score = grader.score(&metrics);
        assert_eq!(score.value, 89.0);
    }

    #[test]
    fn test_poor_availability_floor() {
        let grader = ComponentGrader::default();
        let mut metrics = nominal();
        metrics.availability = 10.0;
        metrics.pct_above_nhnm = 100.0;
        metrics.num_spikes = 1000;
        assert_eq!(grader.score(&metrics).value, 59.0);
    }

    #[test]
    fn test_floor_never_lowers_score() {
        let grader = ComponentGrader::default();
        let mut metrics = nominal();
        metrics.availability = 96.0;
        let score = grader.score(&metrics);
        assert!(score.value > 89.0);
    }

    #[test]
    fn test_noise_level_clamped() {
        assert_eq!(noise_level(80.0, 40.0), 0.0);
        assert_eq!(noise_level(-10.0, 0.0), 100.0);
        assert_eq!(noise_level(3.0, 5.0), 92.0);
    }

    #[test]
    fn test_override_order_is_dead_unresponsive_damaged() {
        let kinds: Vec<ScoreRule> = OVERRIDE_RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![ScoreRule::Dead, ScoreRule::Unresponsive, ScoreRule::Damaged]
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let mut thresholds = QcThresholds::default();
        thresholds.dcl_dead = 20.0;
        let grader = ComponentGrader::new(thresholds);
        // dcl 10 is now considered unresponsive
        assert_eq!(grader.score(&nominal()).value, 1.0);
        assert_eq!(ComponentGrader::default().thresholds().dcl_dead, 2.25);
    }
}

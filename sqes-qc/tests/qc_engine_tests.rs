//! Station scoring scenarios through the public engine API

use chrono::NaiveDate;
use sqes_qc::error::QcIssue;
use sqes_qc::models::{
    BandPercentages, Classification, ComponentMetrics, ComponentScore, QcThresholds, ScoreRule,
};
use sqes_qc::services::{grade, ComponentGrader, QcAnalyzer, StationAggregator};

const WORKED_EXAMPLE_SCORE: f64 = 96.836_138_613_861_38;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Worked-example channel: full day, quiet, no discontinuities
fn nominal(channel: &str) -> ComponentMetrics {
    ComponentMetrics {
        channel: channel.to_string(),
        rms: 200.0,
        amplitude_ratio: 1.5,
        availability: 100.0,
        num_gap: 0,
        num_overlap: 0,
        num_spikes: 0,
        pct_below_nlnm: 5.0,
        pct_above_nhnm: 3.0,
        band_percentages: BandPercentages {
            sp: 90.0,
            bw: 95.0,
            lp: 80.0,
        },
        dcl: 10.0,
        dcg: 0,
    }
}

fn nominal_station() -> Vec<ComponentMetrics> {
    vec![nominal("BHE"), nominal("BHN"), nominal("BHZ")]
}

#[test]
fn test_grade_saturates_at_limit_for_any_margin() {
    for margin in [0.001, 0.5, 1.25, 25.0, 7500.0] {
        assert!((grade(3.0, 3.0, margin) - 100.0).abs() < 1e-12, "margin {}", margin);
    }
}

#[test]
fn test_grade_non_increasing_in_parameter() {
    let thresholds = QcThresholds::default();
    let limit = thresholds.amplitude_ratio;
    let mut previous = f64::INFINITY;
    for step in 0..400 {
        let p = step as f64 * 0.05;
        let g = grade(p, limit.limit, limit.margin);
        assert!(g <= previous, "grade rose at p = {}", p);
        previous = g;
    }
}

#[test]
fn test_default_weights_sum_to_one() {
    let weights = QcThresholds::default().weights;
    assert!((weights.total() - 1.0).abs() < 1e-12);
}

#[test]
fn test_nominal_station_is_baik() {
    let analyzer = QcAnalyzer::default();
    let quality = analyzer.analyze("BBJI", date(), &nominal_station());

    assert!((quality.score - WORKED_EXAMPLE_SCORE).abs() < 1e-9);
    assert_eq!(quality.classification, Classification::Baik);
    assert!(quality.warnings.is_empty());
    assert_eq!(quality.details, "");
}

#[test]
fn test_worked_example_breakdown() {
    let grader = ComponentGrader::default();
    let breakdown = grader.breakdown(&nominal("BHZ"));

    assert_eq!(breakdown.noise, 92.0);
    assert_eq!(breakdown.rms, 100.0);
    assert!((breakdown.amplitude_ratio - 96.361_386).abs() < 1e-5);
    assert_eq!(breakdown.gaps, 100.0);
    assert_eq!(breakdown.overlaps, 100.0);
    assert_eq!(breakdown.spikes, 100.0);

    let score = grader.score(&nominal("BHZ"));
    assert_eq!(score.rule, ScoreRule::Weighted);
    assert!(!score.overridden);
    assert!((score.value - 96.84).abs() < 0.01);
}

#[test]
fn test_dead_channel_scores_zero_regardless_of_other_metrics() {
    let grader = ComponentGrader::default();
    let variants = [
        ComponentMetrics { availability: 0.0, ..nominal("BHZ") },
        ComponentMetrics { availability: 0.0, dcg: 1, dcl: 0.0, ..nominal("BHZ") },
        ComponentMetrics { availability: 0.0, rms: 0.5, ..nominal("BHZ") },
        ComponentMetrics { availability: 0.0, pct_above_nhnm: 100.0, num_gap: 900, ..nominal("BHZ") },
    ];
    for metrics in &variants {
        let score = grader.score(metrics);
        assert_eq!(score.value, 0.0);
        assert_eq!(score.rule, ScoreRule::Dead);
    }
}

#[test]
fn test_unresponsive_channel_scores_one() {
    let grader = ComponentGrader::default();
    let variants = [
        ComponentMetrics { dcg: 1, ..nominal("BHZ") },
        ComponentMetrics { dcl: 2.25, ..nominal("BHZ") },
        ComponentMetrics { dcl: 0.0, availability: 40.0, ..nominal("BHZ") },
    ];
    for metrics in &variants {
        let score = grader.score(metrics);
        assert_eq!(score.value, 1.0);
        assert_eq!(score.rule, ScoreRule::Unresponsive);
    }
}

#[test]
fn test_station_aggregation_example() {
    let aggregator = StationAggregator::new(QcThresholds::default());
    let scores = [
        ComponentScore::from_rule(96.84, ScoreRule::Weighted),
        ComponentScore::from_rule(85.0, ScoreRule::Weighted),
        ComponentScore::from_rule(59.0, ScoreRule::Weighted),
    ];

    let result = aggregator.aggregate(&scores);
    assert!((result.score - 72.0).abs() < 1e-9);
    assert_eq!(result.classification, Classification::CukupBaik);
    assert!(!result.capped);
}

#[test]
fn test_unresponsive_channel_pulls_station_down() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[2].dcl = 1.5;

    let quality = analyzer.analyze("BBJI", date(), &channels);

    // sorted [1, s, s], index 0.5
    let expected = 1.0 + 0.5 * (WORKED_EXAMPLE_SCORE - 1.0);
    assert!((quality.score - expected).abs() < 1e-9);
    assert_eq!(quality.classification, Classification::Buruk);
    assert_eq!(quality.warnings, vec!["Komponen BHZ tidak merespon getaran"]);
}

#[test]
fn test_override_cap_applies_when_percentile_exceeds_floor() {
    let thresholds = QcThresholds {
        station_percentile: 75.0,
        ..QcThresholds::default()
    };
    let analyzer = QcAnalyzer::new(thresholds);
    let mut channels = nominal_station();
    channels[0].dcg = 1;

    let analysis = analyzer.evaluate("BBJI", date(), &channels);

    assert!(analysis.aggregate.capped);
    assert_eq!(analysis.quality.score, 59.0);
    assert_eq!(analysis.quality.classification, Classification::Buruk);
}

#[test]
fn test_classification_boundaries() {
    let cases = [
        (0.0, Classification::Mati),
        (1.0, Classification::Buruk),
        (59.0, Classification::Buruk),
        (60.0, Classification::CukupBaik),
        (89.0, Classification::CukupBaik),
        (90.0, Classification::Baik),
        (100.0, Classification::Baik),
    ];
    for (score, expected) in cases {
        assert_eq!(Classification::from_score(score), expected);
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[1].num_gap = 12;
    channels[2].availability = 85.0;

    let first = analyzer.analyze("BBJI", date(), &channels);
    let second = analyzer.analyze("BBJI", date(), &channels);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_single_gap_condition_yields_single_warning() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[1].availability = 99.5;
    channels[1].num_gap = 6;

    let quality = analyzer.analyze("BBJI", date(), &channels);

    assert_eq!(quality.warnings, vec!["Terlalu banyak gap pada komponen BHN"]);
    assert_eq!(quality.details, "Terlalu banyak gap pada komponen BHN");
}

#[test]
fn test_gap_count_ignored_at_full_availability() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    for metrics in channels.iter_mut() {
        metrics.num_gap = 1;
    }

    let quality = analyzer.analyze("BBJI", date(), &channels);
    assert!((quality.score - WORKED_EXAMPLE_SCORE).abs() < 1e-9);

    // also silences the gap warning
    channels[1].num_gap = 50;
    let quality = analyzer.analyze("BBJI", date(), &channels);
    assert!((quality.score - WORKED_EXAMPLE_SCORE).abs() < 1e-9);
    assert!(quality.warnings.is_empty());

    let analysis = analyzer.evaluate("BBJI", date(), &channels);
    assert!(analysis.channels.iter().all(|c| c.metrics.num_gap == 0));
    assert!(analysis.issues.is_empty());
}

#[test]
fn test_gap_count_kept_below_full_availability() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[1].availability = 99.99;
    channels[1].num_gap = 6;

    let quality = analyzer.analyze("BBJI", date(), &channels);
    assert_eq!(quality.warnings, vec!["Terlalu banyak gap pada komponen BHN"]);
}

#[test]
fn test_warnings_are_channel_major() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[0].num_spikes = 40;
    channels[0].availability = 90.0;
    channels[2].pct_below_nlnm = 30.0;

    // input order must not matter
    channels.reverse();
    let quality = analyzer.analyze("BBJI", date(), &channels);

    assert_eq!(
        quality.warnings,
        vec![
            "Spike berlebihan pada komponen BHE",
            "Availability rendah pada komponen BHE",
            "Cek metadata komponen BHZ",
        ]
    );
}

#[test]
fn test_dead_station() {
    let analyzer = QcAnalyzer::default();
    let channels = vec![
        ComponentMetrics::missing("SHE"),
        ComponentMetrics::missing("SHN"),
        ComponentMetrics::missing("SHZ"),
    ];

    let quality = analyzer.analyze("MNAI", date(), &channels);

    assert_eq!(quality.score, 0.0);
    assert_eq!(quality.classification, Classification::Mati);
    assert_eq!(
        quality.warnings,
        vec!["Komponen SHE Mati", "Komponen SHN Mati", "Komponen SHZ Mati"]
    );
}

#[test]
fn test_no_metrics_at_all() {
    let analyzer = QcAnalyzer::default();
    let analysis = analyzer.evaluate("MNAI", date(), &[]);

    assert_eq!(analysis.quality.score, 0.0);
    assert_eq!(analysis.quality.classification, Classification::Mati);
    assert_eq!(analysis.quality.warnings, vec!["Tidak ada data"]);
    assert_eq!(analysis.quality.details, "Tidak ada data");
    assert!(analysis.issues.is_empty());
    assert!(analysis.channels.iter().all(|c| c.synthesized));
}

#[test]
fn test_missing_components_are_synthesized_and_reported() {
    let analyzer = QcAnalyzer::default();
    let analysis = analyzer.evaluate("BBJI", date(), &[nominal("HHZ")]);

    assert_eq!(analysis.quality.score, 0.0);
    assert_eq!(analysis.quality.classification, Classification::Mati);
    assert_eq!(
        analysis.issues,
        vec![
            QcIssue::MissingData { component: "HHE".to_string() },
            QcIssue::MissingData { component: "HHN".to_string() },
            QcIssue::AggregationInput { available: 1 },
        ]
    );
    assert_eq!(
        analysis.quality.details,
        "Komponen HHE Mati, Komponen HHN Mati | missing data for component HHE; \
         missing data for component HHN; only 1 of 3 components available"
    );
}

#[test]
fn test_invalid_metric_is_clamped_and_reported() {
    let analyzer = QcAnalyzer::default();
    let mut channels = nominal_station();
    channels[2].availability = f64::NAN;

    let analysis = analyzer.evaluate("BBJI", date(), &channels);

    assert_eq!(analysis.channels[2].metrics.availability, 0.0);
    assert_eq!(analysis.channels[2].score.rule, ScoreRule::Dead);
    assert!(analysis
        .quality
        .details
        .contains("invalid availability on BHZ: NaN clamped to 0"));
    assert!(analysis.quality.score.is_finite());
}

#[test]
fn test_availability_floor_lifts_poor_channel() {
    let grader = ComponentGrader::default();
    let noisy = ComponentMetrics {
        availability: 60.0,
        pct_above_nhnm: 80.0,
        pct_below_nlnm: 20.0,
        num_gap: 40,
        ..nominal("BHZ")
    };
    assert_eq!(grader.score(&noisy).value, 89.0);

    let sparse = ComponentMetrics { availability: 20.0, ..noisy };
    assert_eq!(grader.score(&sparse).value, 59.0);
}

#[test]
fn test_threshold_sets_coexist() {
    let strict = QcAnalyzer::new(QcThresholds {
        dcl_dead: 12.0,
        ..QcThresholds::default()
    });
    let lenient = QcAnalyzer::default();
    let channels = nominal_station();

    let strict_quality = strict.analyze("BBJI", date(), &channels);
    let lenient_quality = lenient.analyze("BBJI", date(), &channels);

    assert_eq!(strict_quality.score, 1.0);
    assert_eq!(strict_quality.classification, Classification::Buruk);
    assert_eq!(lenient_quality.classification, Classification::Baik);
}

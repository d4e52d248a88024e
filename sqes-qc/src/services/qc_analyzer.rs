//! Station quality engine
//!
//! Turns the per-channel metrics of one (station, date) into a
//! [`StationQuality`]. The analyzer never fails: missing channels are
//! synthesized as dead, out-of-domain metrics are clamped, and each such
//! correction is reported as a [`QcIssue`] in the logs and in `details`.
//!
//! # Pipeline
//! 1. Sanitize every channel's metrics
//! 2. Order channels E, N, Z (synthesizing any that are absent)
//! 3. Grade each channel
//! 4. Aggregate to the station score and classification
//! 5. Collect warnings channel-major

use crate::error::QcIssue;
use crate::models::{
    Component, ComponentMetrics, ComponentScore, QcThresholds, StationQuality,
};
use crate::services::component_grader::ComponentGrader;
use crate::services::station_aggregator::{StationAggregator, StationScore};
use crate::services::warning_generator::{WarningGenerator, NO_DATA_WARNING};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Separates warnings in `details`
const WARNING_SEPARATOR: &str = ", ";

/// Graded channel within a station analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub component: Component,
    /// Sanitized metrics the score was computed from
    pub metrics: ComponentMetrics,
    pub score: ComponentScore,
    /// True when the channel had no metrics and was synthesized
    pub synthesized: bool,
}

/// Full result of one station analysis
#[derive(Debug, Clone, PartialEq)]
pub struct StationAnalysis {
    pub quality: StationQuality,
    /// Always E, N, Z
    pub channels: Vec<ChannelReport>,
    pub issues: Vec<QcIssue>,
    pub aggregate: StationScore,
}

/// Scoring engine bound to one threshold set
#[derive(Debug, Clone)]
pub struct QcAnalyzer {
    grader: ComponentGrader,
    aggregator: StationAggregator,
    warnings: WarningGenerator,
}

impl QcAnalyzer {
    pub fn new(thresholds: QcThresholds) -> Self {
        Self {
            grader: ComponentGrader::new(thresholds.clone()),
            aggregator: StationAggregator::new(thresholds.clone()),
            warnings: WarningGenerator::new(thresholds),
        }
    }

    pub fn thresholds(&self) -> &QcThresholds {
        self.grader.thresholds()
    }

    /// Station verdict for `channels`
    pub fn analyze(&self, station: &str, date: NaiveDate, channels: &[ComponentMetrics]) -> StationQuality {
        self.evaluate(station, date, channels).quality
    }

    /// Station verdict with per-channel scores and detected issues
    pub fn evaluate(&self, station: &str, date: NaiveDate, channels: &[ComponentMetrics]) -> StationAnalysis {
        let mut issues = Vec::new();

        let sanitized: Vec<ComponentMetrics> = channels
            .iter()
            .map(|metrics| sanitize(metrics, &mut issues))
            .collect();

        let ordered = order_components(&sanitized, &mut issues);

        let available = ordered.iter().filter(|(_, _, synthesized)| !synthesized).count();
        if available > 0 && available < Component::ALL.len() {
            issues.push(QcIssue::AggregationInput { available });
        }

        let reports: Vec<ChannelReport> = ordered
            .into_iter()
            .map(|(component, metrics, synthesized)| {
                let score = if synthesized {
                    ComponentScore::missing()
                } else {
                    self.grader.score(&metrics)
                };
                ChannelReport {
                    component,
                    metrics,
                    score,
                    synthesized,
                }
            })
            .collect();

        let scores = [reports[0].score, reports[1].score, reports[2].score];
        let aggregate = self.aggregator.aggregate(&scores);

        let warnings = if available == 0 {
            vec![NO_DATA_WARNING.to_string()]
        } else {
            self.warnings
                .station_warnings(reports.iter().map(|r| (&r.metrics, &r.score)))
        };

        for issue in &issues {
            warn!(station = %station, date = %date, issue = %issue, "QC input issue");
        }

        let details = format_details(&warnings, &issues);

        info!(
            station = %station,
            date = %date,
            score = aggregate.score,
            result = %aggregate.classification,
            warnings = warnings.len(),
            "Station QC analysis finished"
        );

        StationAnalysis {
            quality: StationQuality {
                station: station.to_string(),
                date,
                score: aggregate.score,
                classification: aggregate.classification,
                warnings,
                details,
            },
            channels: reports,
            issues,
            aggregate,
        }
    }
}

impl Default for QcAnalyzer {
    fn default() -> Self {
        Self::new(QcThresholds::default())
    }
}

/// Warnings joined for display, followed by any input issues
pub fn format_details(warnings: &[String], issues: &[QcIssue]) -> String {
    let mut details = warnings.join(WARNING_SEPARATOR);
    if !issues.is_empty() {
        let notes: Vec<String> = issues.iter().map(ToString::to_string).collect();
        if !details.is_empty() {
            details.push_str(" | ");
        }
        details.push_str(&notes.join("; "));
    }
    details
}

/// Pick one metrics record per component, synthesizing the absent ones
///
/// Returns `(component, metrics, synthesized)` in E, N, Z order.
fn order_components(
    channels: &[ComponentMetrics],
    issues: &mut Vec<QcIssue>,
) -> Vec<(Component, ComponentMetrics, bool)> {
    let mut slots: [Option<&ComponentMetrics>; 3] = [None, None, None];

    for metrics in channels {
        let slot = metrics
            .component()
            .and_then(|c| Component::ALL.iter().position(|x| *x == c));
        match slot {
            Some(index) if slots[index].is_none() => slots[index] = Some(metrics),
            _ => issues.push(QcIssue::IgnoredChannel {
                channel: metrics.channel.clone(),
            }),
        }
    }

    // Band/instrument prefix of the first known channel, e.g. "BH"
    let prefix = slots
        .iter()
        .flatten()
        .next()
        .and_then(|m| {
            let code = m.channel.trim();
            code.char_indices().last().map(|(i, _)| code[..i].to_string())
        })
        .unwrap_or_default();

    Component::ALL
        .iter()
        .zip(slots)
        .map(|(component, slot)| match slot {
            Some(metrics) => (*component, metrics.clone(), false),
            None => {
                let channel = format!("{}{}", prefix, component);
                debug!(channel = %channel, "Synthesizing missing channel");
                if !prefix.is_empty() {
                    issues.push(QcIssue::MissingData {
                        component: channel.clone(),
                    });
                }
                (*component, ComponentMetrics::missing(channel), true)
            }
        })
        .collect()
}

/// Clamp one metric into `[min, max]`, NaN going to `min`
fn clamp_metric(
    value: f64,
    min: f64,
    max: f64,
    channel: &str,
    metric: &'static str,
    issues: &mut Vec<QcIssue>,
) -> f64 {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value || value.is_nan() {
        issues.push(QcIssue::InvalidMetric {
            channel: channel.to_string(),
            metric,
            value,
            clamped,
        });
    }
    clamped
}

/// Copy of `metrics` with every value inside its domain
fn sanitize(metrics: &ComponentMetrics, issues: &mut Vec<QcIssue>) -> ComponentMetrics {
    let ch = metrics.channel.as_str();
    let mut clean = metrics.clone();

    clean.rms = clamp_metric(metrics.rms, 0.0, f64::INFINITY, ch, "rms", issues);
    clean.amplitude_ratio = clamp_metric(
        metrics.amplitude_ratio,
        0.0,
        f64::INFINITY,
        ch,
        "amplitude_ratio",
        issues,
    );
    clean.availability = clamp_metric(metrics.availability, 0.0, 100.0, ch, "availability", issues);
    // a fully covered day has no gaps worth grading
    if clean.availability >= 100.0 {
        clean.num_gap = 0;
    }
    clean.pct_below_nlnm = clamp_metric(metrics.pct_below_nlnm, 0.0, 100.0, ch, "pct_below_nlnm", issues);
    clean.pct_above_nhnm = clamp_metric(metrics.pct_above_nhnm, 0.0, 100.0, ch, "pct_above_nhnm", issues);
    clean.band_percentages.sp = clamp_metric(metrics.band_percentages.sp, 0.0, 100.0, ch, "sp_percentage", issues);
    clean.band_percentages.bw = clamp_metric(metrics.band_percentages.bw, 0.0, 100.0, ch, "bw_percentage", issues);
    clean.band_percentages.lp = clamp_metric(metrics.band_percentages.lp, 0.0, 100.0, ch, "lp_percentage", issues);
    clean.dcl = clamp_metric(metrics.dcl, 0.0, f64::INFINITY, ch, "dcl", issues);

    if metrics.dcg > 1 {
        issues.push(QcIssue::InvalidMetric {
            channel: ch.to_string(),
            metric: "dcg",
            value: f64::from(metrics.dcg),
            clamped: 1.0,
        });
        clean.dcg = 1;
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BandPercentages, Classification, ScoreRule};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

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
            band_percentages: BandPercentages::default(),
            dcl: 10.0,
            dcg: 0,
        }
    }

    #[test]
    fn test_healthy_station() {
        let analyzer = QcAnalyzer::default();
        let channels = [nominal("BHZ"), nominal("BHN"), nominal("BHE")];
        let analysis = analyzer.evaluate("ABCD", date(), &channels);

        assert!((analysis.quality.score - 96.836).abs() < 1e-3);
        assert_eq!(analysis.quality.classification, Classification::Baik);
        assert!(analysis.quality.warnings.is_empty());
        assert!(analysis.quality.details.is_empty());
        assert!(analysis.issues.is_empty());

        let order: Vec<Component> = analysis.channels.iter().map(|c| c.component).collect();
        assert_eq!(order, Component::ALL.to_vec());
    }

    #[test]
    fn test_no_data_station() {
        let quality = QcAnalyzer::default().analyze("ABCD", date(), &[]);
        assert_eq!(quality.score, 0.0);
        assert_eq!(quality.classification, Classification::Mati);
        assert_eq!(quality.warnings, vec![NO_DATA_WARNING.to_string()]);
        assert_eq!(quality.details, NO_DATA_WARNING);
    }

    #[test]
    fn test_missing_channel_synthesized() {
        let analyzer = QcAnalyzer::default();
        let analysis = analyzer.evaluate("ABCD", date(), &[nominal("SHZ"), nominal("SHE")]);

        let north = &analysis.channels[1];
        assert!(north.synthesized);
        assert_eq!(north.metrics.channel, "SHN");
        assert_eq!(north.score.value, 0.0);
        assert!(north.score.overridden);

        assert!(analysis.issues.contains(&QcIssue::AggregationInput { available: 2 }));
        assert!(analysis.issues.contains(&QcIssue::MissingData {
            component: "SHN".to_string()
        }));
        assert_eq!(analysis.quality.warnings, vec!["Komponen SHN Mati".to_string()]);
        assert!(analysis.quality.details.starts_with("Komponen SHN Mati | "));
    }

    #[test]
    fn test_numeric_component_codes() {
        let analyzer = QcAnalyzer::default();
        let analysis = analyzer.evaluate("ABCD", date(), &[nominal("BH1"), nominal("BH2"), nominal("BHZ")]);
        assert!(analysis.issues.is_empty());
        let channels: Vec<&str> = analysis.channels.iter().map(|c| c.metrics.channel.as_str()).collect();
        assert_eq!(channels, vec!["BH2", "BH1", "BHZ"]);
    }

    #[test]
    fn test_invalid_metrics_clamped() {
        let analyzer = QcAnalyzer::default();
        let mut bad = nominal("BHZ");
        bad.availability = 130.0;
        bad.pct_above_nhnm = f64::NAN;
        bad.dcg = 3;

        let analysis = analyzer.evaluate("ABCD", date(), &[nominal("BHE"), nominal("BHN"), bad]);
        let z = &analysis.channels[2];
        assert_eq!(z.metrics.availability, 100.0);
        assert_eq!(z.metrics.pct_above_nhnm, 0.0);
        assert_eq!(z.score.rule, ScoreRule::Unresponsive);
        assert_eq!(analysis.issues.len(), 3);
        assert!(analysis.quality.details.contains("invalid availability on BHZ"));
    }

    #[test]
    fn test_duplicate_and_unknown_channels_ignored() {
        let analyzer = QcAnalyzer::default();
        let mut second_z = nominal("BHZ");
        second_z.availability = 0.0;
        let channels = [nominal("BHE"), nominal("BHN"), nominal("BHZ"), second_z, nominal("BHX")];

        let analysis = analyzer.evaluate("ABCD", date(), &channels);
        assert_eq!(analysis.channels[2].metrics.availability, 100.0);
        assert_eq!(analysis.issues.len(), 2);
    }

    #[test]
    fn test_unresponsive_channel_caps_station() {
        let analyzer = QcAnalyzer::default();
        let mut flat = nominal("BHZ");
        flat.dcl = 1.0;
        let quality = analyzer.analyze("ABCD", date(), &[nominal("BHE"), nominal("BHN"), flat]);

        assert!(quality.score <= 59.0);
        assert_eq!(quality.classification, Classification::Buruk);
        assert_eq!(quality.warnings, vec!["Komponen BHZ tidak merespon getaran".to_string()]);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = QcAnalyzer::default();
        let mut gappy = nominal("BHN");
        gappy.num_gap = 12;
        gappy.availability = 91.5;
        let channels = [nominal("BHE"), gappy, nominal("BHZ")];

        let first = analyzer.analyze("ABCD", date(), &channels);
        let second = analyzer.analyze("ABCD", date(), &channels);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_format_details() {
        let warnings = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_details(&warnings, &[]), "a, b");
        assert_eq!(format_details(&[], &[]), "");
        assert_eq!(
            format_details(&[], &[QcIssue::AggregationInput { available: 1 }]),
            "only 1 of 3 components available"
        );
    }
}

//! Diagnostic warnings per channel
//!
//! Overridden channels get a single fixed message. All other channels run
//! through [`WARNING_RULES`], every rule independently and in table order.

use crate::models::{ComponentMetrics, ComponentScore, QcThresholds, ScoreRule};

/// Single warning when a station has no data on any channel
pub const NO_DATA_WARNING: &str = "Tidak ada data";

/// Quality condition with its message template (`{ch}` is the channel code)
#[derive(Debug, Clone, Copy)]
pub struct WarningRule {
    pub template: &'static str,
    pub applies: fn(&ComponentMetrics, &QcThresholds) -> bool,
}

impl WarningRule {
    pub fn render(&self, channel: &str) -> String {
        self.template.replace("{ch}", channel)
    }
}

/// Quality warnings in evaluation order
pub const WARNING_RULES: [WarningRule; 7] = [
    WarningRule {
        template: "Cek metadata komponen {ch}",
        applies: |m, t| m.pct_below_nlnm > t.pct_below_warn,
    },
    WarningRule {
        template: "Terlalu banyak gap pada komponen {ch}",
        applies: |m, t| m.num_gap > t.gap_count_warn,
    },
    WarningRule {
        template: "Terlalu banyak overlap pada komponen {ch}",
        applies: |m, t| m.num_overlap > t.overlap_count_warn,
    },
    WarningRule {
        template: "Noise tinggi di komponen {ch}",
        applies: |m, t| {
            m.pct_above_nhnm > t.pct_above_warn && m.availability >= t.avail_min_for_noise_check
        },
    },
    WarningRule {
        template: "Spike berlebihan pada komponen {ch}",
        applies: |m, t| m.num_spikes > t.spike_count_warn,
    },
    WarningRule {
        template: "Availability rendah pada komponen {ch}",
        applies: |m, t| m.availability >= t.avail_low_warn && m.availability < t.avail_good,
    },
    WarningRule {
        template: "Availability sangat rendah pada komponen {ch}",
        applies: |m, t| m.availability > 0.0 && m.availability < t.avail_low_warn,
    },
];

/// Fixed message for an override rule
pub fn override_message(rule: ScoreRule, channel: &str) -> Option<String> {
    match rule {
        ScoreRule::Dead => Some(format!("Komponen {} Mati", channel)),
        ScoreRule::Unresponsive => Some(format!("Komponen {} tidak merespon getaran", channel)),
        ScoreRule::Damaged => Some(format!("Komponen {} Rusak", channel)),
        ScoreRule::Weighted => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct WarningGenerator {
    thresholds: QcThresholds,
}

impl WarningGenerator {
    pub fn new(thresholds: QcThresholds) -> Self {
        Self { thresholds }
    }

    /// Warnings for one channel given the score it received
    pub fn channel_warnings(&self, metrics: &ComponentMetrics, score: &ComponentScore) -> Vec<String> {
        if let Some(message) = override_message(score.rule, &metrics.channel) {
            return vec![message];
        }

        WARNING_RULES
            .iter()
            .filter(|rule| (rule.applies)(metrics, &self.thresholds))
            .map(|rule| rule.render(&metrics.channel))
            .collect()
    }

    /// Station warnings, channel-major in the order given
    pub fn station_warnings<'a, I>(&self, channels: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a ComponentMetrics, &'a ComponentScore)>,
    {
        channels
            .into_iter()
            .flat_map(|(metrics, score)| self.channel_warnings(metrics, score))
            .collect()
    }
}

//! Scores and station verdicts

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which grading rule produced a component score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreRule {
    /// No data for the day
    Dead,
    /// Sensor not transducing ground motion (DCG flag or low DCL)
    Unresponsive,
    /// Sub-unit RMS, broken sensor
    Damaged,
    /// Weighted formula (with availability floor)
    Weighted,
}

impl ScoreRule {
    /// True for the hard overrides that bypass the weighted formula
    pub fn is_override(&self) -> bool {
        !matches!(self, ScoreRule::Weighted)
    }
}

/// Score of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    /// 0–100
    pub value: f64,
    /// True iff a dead/unresponsive/damaged override determined `value`
    pub overridden: bool,
    pub rule: ScoreRule,
}

impl ComponentScore {
    pub fn from_rule(value: f64, rule: ScoreRule) -> Self {
        Self {
            value,
            overridden: rule.is_override(),
            rule,
        }
    }

    /// Stand-in score for a channel that was never reported
    pub fn missing() -> Self {
        Self::from_rule(0.0, ScoreRule::Dead)
    }
}

/// Four-level station classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Baik,
    CukupBaik,
    Buruk,
    Mati,
}

impl Classification {
    /// Map a station score to its classification
    ///
    /// `>= 90` Baik, `>= 60` Cukup Baik, exactly `0` Mati, anything else Buruk.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Classification::Baik
        } else if score >= 60.0 {
            Classification::CukupBaik
        } else if score == 0.0 {
            Classification::Mati
        } else {
            Classification::Buruk
        }
    }

    /// Label as stored in the `result` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Baik => "Baik",
            Classification::CukupBaik => "Cukup Baik",
            Classification::Buruk => "Buruk",
            Classification::Mati => "Mati",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Baik" => Ok(Classification::Baik),
            "Cukup Baik" | "CukupBaik" => Ok(Classification::CukupBaik),
            "Buruk" => Ok(Classification::Buruk),
            "Mati" => Ok(Classification::Mati),
            other => Err(format!("Unknown classification: {}", other)),
        }
    }
}

/// Daily verdict for one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationQuality {
    pub station: String,
    pub date: NaiveDate,
    /// 0–100
    pub score: f64,
    pub classification: Classification,
    /// Warnings in evaluation order (E, then N, then Z)
    pub warnings: Vec<String>,
    /// Free-form notes
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

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
            assert_eq!(Classification::from_score(score), expected, "score {}", score);
        }
    }

    #[test]
    fn test_classification_between_integers() {
        assert_eq!(Classification::from_score(0.5), Classification::Buruk);
        assert_eq!(Classification::from_score(59.99), Classification::Buruk);
        assert_eq!(Classification::from_score(89.99), Classification::CukupBaik);
    }

    #[test]
    fn test_classification_label_round_trip() {
        for class in [
            Classification::Baik,
            Classification::CukupBaik,
            Classification::Buruk,
            Classification::Mati,
        ] {
            assert_eq!(class.as_str().parse::<Classification>().unwrap(), class);
        }
        assert!("Bagus".parse::<Classification>().is_err());
    }

    #[test]
    fn test_override_flag_follows_rule() {
        assert!(ComponentScore::from_rule(1.0, ScoreRule::Damaged).overridden);
        assert!(!ComponentScore::from_rule(95.0, ScoreRule::Weighted).overridden);
        assert_eq!(ComponentScore::missing().value, 0.0);
    }
}

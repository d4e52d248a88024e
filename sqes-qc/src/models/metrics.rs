//! Per-channel daily metrics
//!
//! One [`ComponentMetrics`] record exists per (station, date, channel). It is
//! produced by the extraction pipeline (or loaded from the database) and is
//! never mutated by the scoring engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orientation of a seismometer channel
///
/// Stations report either `E,N,Z` or `1,2,Z` component codes. `1` is the
/// north-ish horizontal and `2` the east-ish horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    E,
    N,
    Z,
}

impl Component {
    /// Evaluation order for station aggregation and warnings
    pub const ALL: [Component; 3] = [Component::E, Component::N, Component::Z];

    /// Component from a single component code (`E`, `N`, `Z`, `1`, `2`)
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'E' | '2' => Some(Component::E),
            'N' | '1' => Some(Component::N),
            'Z' => Some(Component::Z),
            _ => None,
        }
    }

    /// Component from a full SEED channel code (`BHZ`, `HHN`, `SH1`, ...)
    pub fn from_channel(channel: &str) -> Option<Self> {
        channel.trim().chars().last().and_then(Self::from_code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::E => "E",
            Component::N => "N",
            Component::Z => "Z",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percent of the PSD inside the noise models per period band
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandPercentages {
    /// Short period, 0.1–1 s
    pub sp: f64,
    /// Body-wave / microseism band, 2–25 s
    pub bw: f64,
    /// Long period, 20–900 s
    pub lp: f64,
}

/// Daily metrics for one channel of one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    /// Full channel code as recorded (e.g. `BHZ`)
    pub channel: String,
    pub rms: f64,
    pub amplitude_ratio: f64,
    /// Percent of the day covered by data, 0–100
    pub availability: f64,
    pub num_gap: u32,
    pub num_overlap: u32,
    pub num_spikes: u32,
    pub pct_below_nlnm: f64,
    pub pct_above_nhnm: f64,
    pub band_percentages: BandPercentages,
    /// Linear dead-channel metric (RMSE of the PSD line fit, dB)
    pub dcl: f64,
    /// GSN dead-channel flag (0 or 1)
    pub dcg: u8,
}

impl ComponentMetrics {
    /// Metrics standing in for a channel with no data at all
    ///
    /// `availability = 0` makes the grader apply the dead-channel override.
    pub fn missing(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            rms: 0.0,
            amplitude_ratio: 0.0,
            availability: 0.0,
            num_gap: 1,
            num_overlap: 0,
            num_spikes: 0,
            pct_below_nlnm: 0.0,
            pct_above_nhnm: 100.0,
            band_percentages: BandPercentages::default(),
            dcl: 0.0,
            dcg: 0,
        }
    }

    /// Orientation derived from the channel code
    pub fn component(&self) -> Option<Component> {
        Component::from_channel(&self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_from_channel() {
        assert_eq!(Component::from_channel("BHZ"), Some(Component::Z));
        assert_eq!(Component::from_channel("HHE"), Some(Component::E));
        assert_eq!(Component::from_channel("SHN"), Some(Component::N));
        assert_eq!(Component::from_channel("BH1"), Some(Component::N));
        assert_eq!(Component::from_channel("BH2"), Some(Component::E));
        assert_eq!(Component::from_channel("z"), Some(Component::Z));
        assert_eq!(Component::from_channel("BHX"), None);
        assert_eq!(Component::from_channel(""), None);
    }

    #[test]
    fn test_component_order_is_e_n_z() {
        let mut components = vec![Component::Z, Component::E, Component::N];
        components.sort();
        assert_eq!(components, Component::ALL.to_vec());
    }

    #[test]
    fn test_missing_metrics_are_dead() {
        let metrics = ComponentMetrics::missing("BHZ");
        assert_eq!(metrics.availability, 0.0);
        assert_eq!(metrics.component(), Some(Component::Z));
    }
}

//! Data models for QC analysis

pub mod metrics;
pub mod quality;
pub mod spectral;
pub mod thresholds;
pub mod trace;

pub use metrics::{BandPercentages, Component, ComponentMetrics};
pub use quality::{Classification, ComponentScore, ScoreRule, StationQuality};
pub use spectral::SpectralCurves;
pub use thresholds::{GradeLimit, QcThresholds, ScoreWeights};
pub use trace::{Trace, TraceSegment};

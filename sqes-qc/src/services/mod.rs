//! QC services
//!
//! Pure computations, leaves first: metric extraction, spectral summaries,
//! dead-channel detection, grading, aggregation, warnings, and the
//! [`QcAnalyzer`] facade tying the scoring steps together.

pub mod component_grader;
pub mod dead_channel;
pub mod metric_extractor;
pub mod qc_analyzer;
pub mod spectral_summary;
pub mod spike_detector;
pub mod station_aggregator;
pub mod warning_generator;

pub use component_grader::{grade, ComponentGrader, GradeBreakdown, OverrideRule, OVERRIDE_RULES};
pub use dead_channel::{DeadChannelMetrics, dead_channel_gsn, dead_channel_lin};
pub use metric_extractor::{BasicMetrics, MetricExtractor};
pub use qc_analyzer::{ChannelReport, QcAnalyzer, StationAnalysis};
pub use spectral_summary::SpectralSummary;
pub use spike_detector::{SpikeDetector, SpikeError, SpikeMethod};
pub use station_aggregator::{percentile, StationAggregator, StationScore};
pub use warning_generator::{WarningGenerator, WarningRule, NO_DATA_WARNING, WARNING_RULES};

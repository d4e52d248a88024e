//! QC workflow
//!
//! Everything with I/O lives here: data collaborators, the per-channel
//! pipeline and the run orchestrator.

pub mod channel_pipeline;
pub mod orchestrator;
pub mod sources;

pub use channel_pipeline::{ChannelOutcome, ChannelPipeline, ChannelStatus, DEFAULT_MAX_GAP_COUNT};
pub use orchestrator::{QcWorkflow, RunOptions, RunSummary};
pub use sources::{DirectoryArchive, SpectralEstimator, WaveformSource};

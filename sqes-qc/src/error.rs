//! Error types for sqes-qc
//!
//! Two families live here:
//! - [`QcError`]: fatal workflow failures (storage, configuration, bad
//!   command-line ranges). Propagated with `?` up to the binary.
//! - [`QcIssue`]: non-fatal data problems found while scoring. The engine
//!   resolves them locally (clamping or synthesizing channels), logs them and
//!   records them in the station's details.

use thiserror::Error;

/// Workflow error type
#[derive(Debug, Error)]
pub enum QcError {
    /// Shared configuration / database error
    #[error("Common error: {0}")]
    Common(#[from] sqes_common::Error),

    /// Database query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File access error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Warning list (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid date range or station selection
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Waveform acquisition failure
    #[error("Acquisition failed for {channel}: {message}")]
    Acquisition { channel: String, message: String },
}

/// Workflow result type
pub type QcResult<T> = std::result::Result<T, QcError>;

/// Non-fatal data problem detected during scoring
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QcIssue {
    /// No metrics for a channel; replaced by a synthetic dead channel
    #[error("missing data for component {component}")]
    MissingData { component: String },

    /// Metric outside its domain; clamped to the nearest valid bound
    #[error("invalid {metric} on {channel}: {value} clamped to {clamped}")]
    InvalidMetric {
        channel: String,
        metric: &'static str,
        value: f64,
        clamped: f64,
    },

    /// Fewer than three channels reported for the station
    #[error("only {available} of 3 components available")]
    AggregationInput { available: usize },

    /// Channel code without a recognised orientation, or a repeated one
    #[error("ignored channel {channel}")]
    IgnoredChannel { channel: String },
}

//! sqes-qc library interface
//!
//! Seismic station quality control: per-channel metrics, the scoring
//! engine and the daily QC workflow.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{QcError, QcIssue, QcResult};
pub use crate::services::QcAnalyzer;
pub use crate::workflow::{QcWorkflow, RunOptions, RunSummary};

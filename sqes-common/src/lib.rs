//! # SQES Common Library
//!
//! Shared code for the SQES seismic quality-control crates:
//! - Error types
//! - Configuration loading (TOML bootstrap, config path resolution)
//! - Database initialization
//! - Processing-day utilities

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::DayWindow;

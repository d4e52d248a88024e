//! Configuration for sqes-qc
//!
//! Loaded from a TOML file resolved by `sqes_common::config` (CLI argument,
//! then `SQES_CONFIG`, then the platform config directories). Every section
//! is optional and falls back to built-in defaults.
//!
//! ```toml
//! database_path = "/var/lib/sqes/sqes.db"
//! worker_count = 8
//! max_gap_count = 2000
//!
//! [source]
//! directory = "/data/sqes/archive"
//!
//! [spike]
//! method = "efficient"
//!
//! [thresholds]
//! dcl_dead = 2.25
//!
//! [logging]
//! level = "debug"
//!
//! [[stations]]
//! code = "BBJI"
//! network = "IA"
//! channel_prefixes = ["BH", "SH"]
//! ```

use crate::db::Station;
use crate::models::QcThresholds;
use crate::services::{MetricExtractor, SpikeDetector, SpikeMethod};
use crate::workflow::DEFAULT_MAX_GAP_COUNT;
use serde::{Deserialize, Serialize};
use sqes_common::config::LoggingConfig;
use sqes_common::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Database file name used when no path is configured
const DEFAULT_DATABASE_FILE: &str = "sqes.db";

/// Spike detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeSettings {
    pub method: SpikeMethod,
    /// Rolling window in samples
    pub window: usize,
    pub sigma: f64,
}

impl Default for SpikeSettings {
    fn default() -> Self {
        Self {
            method: SpikeMethod::Fast,
            window: 80,
            sigma: 10.0,
        }
    }
}

impl SpikeSettings {
    /// Build the configured detector
    pub fn detector(&self) -> Result<SpikeDetector> {
        let detector = SpikeDetector::new()
            .with_window(self.window)
            .and_then(|d| d.with_sigma(self.sigma))
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(detector.with_method(self.method))
    }
}

/// Waveform source settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Root of the JSON waveform archive; unset means analysis-only runs
    pub directory: Option<PathBuf>,
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite database file
    pub database_path: Option<PathBuf>,

    /// Concurrent station workers (default: CPU cores + 1)
    pub worker_count: Option<usize>,

    /// Gap count above which spectral processing is skipped
    pub max_gap_count: Option<u32>,

    pub source: SourceSettings,
    pub spike: SpikeSettings,
    pub thresholds: QcThresholds,
    pub logging: LoggingConfig,

    /// Stations registered (upserted) at startup
    pub stations: Vec<Station>,
}

impl TomlConfig {
    /// Configured worker count or CPU cores + 1
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(count) if count > 0 => count,
            _ => {
                let cpu_count = num_cpus::get();
                let auto_count = cpu_count + 1;
                info!(
                    "worker_count not set, auto-detected: {} (CPU cores: {})",
                    auto_count, cpu_count
                );
                auto_count
            }
        }
    }

    /// Configured database path or `sqes.db` in the platform data directory
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("sqes").join(DEFAULT_DATABASE_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
        })
    }

    pub fn resolved_max_gap_count(&self) -> u32 {
        self.max_gap_count.unwrap_or(DEFAULT_MAX_GAP_COUNT)
    }

    /// Metric extractor with the configured spike detector
    pub fn metric_extractor(&self) -> Result<MetricExtractor> {
        Ok(MetricExtractor::new(self.spike.detector()?))
    }

    /// Reject settings that cannot produce meaningful scores
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.spike.detector()?;
        Ok(())
    }
}

//! Seismic station quality control (sqes-qc) - Main entry point
//!
//! Computes per-channel metrics for a date range, scores each station-day
//! and stores the verdicts in SQLite.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sqes_common::config::{
    load_toml_config, resolve_config_path, write_toml_config, CONFIG_ENV_VAR,
};
use sqes_common::db::init_database;
use sqes_common::time::parse_cli_date;
use sqes_qc::config::TomlConfig;
use sqes_qc::db;
use sqes_qc::workflow::{ChannelPipeline, DirectoryArchive, SpectralEstimator, WaveformSource};
use sqes_qc::{QcAnalyzer, QcWorkflow, RunOptions};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for sqes-qc
#[derive(Parser, Debug)]
#[command(name = "sqes-qc")]
#[command(about = "Seismic station data quality scoring")]
#[command(version)]
struct Args {
    /// First day to process (YYYYMMDD)
    #[arg(short, long, value_parser = parse_date, required_unless_present = "write_config")]
    start: Option<NaiveDate>,

    /// Last day to process, inclusive (YYYYMMDD, default: start)
    #[arg(short, long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Only process these station codes (repeatable, default: all)
    #[arg(long = "station", value_name = "CODE")]
    stations: Vec<String>,

    /// Delete existing metrics and verdicts first (single-day runs only)
    #[arg(short, long)]
    flush: bool,

    /// Score persisted metrics only, even when a waveform archive is configured
    #[arg(long)]
    analysis_only: bool,

    /// Config file path
    #[arg(short, long, env = "SQES_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (overrides the config file)
    #[arg(short, long, env = "SQES_DATABASE")]
    database: Option<PathBuf>,

    /// Write the effective configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_cli_date(value).map_err(|e| e.to_string())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Logs go to the configured
/// file when set, stderr otherwise.
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("sqes_qc={level},sqes_common={level}"))
    });

    let (stderr_layer, file_layer) = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            (None, Some(layer))
        }
        None => (Some(tracing_subscriber::fmt::layer()), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing exists; its own log lines are dropped
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config: TomlConfig =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config)?;

    info!("Starting sqes-qc v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using compiled defaults"),
    }

    if let Some(path) = &args.write_config {
        write_toml_config(&config, path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let Some(start) = args.start else {
        bail!("--start is required");
    };
    let end = args.end.unwrap_or(start);
    if args.flush && end != start {
        bail!("--flush is only allowed for single-day runs");
    }

    let database_path = args
        .database
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    let pool = init_database(&database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database: {}", database_path.display());

    for station in &config.stations {
        db::upsert_station(&pool, station)
            .await
            .with_context(|| format!("Failed to register station {}", station.code))?;
    }
    if !config.stations.is_empty() {
        info!("Registered {} stations from config", config.stations.len());
    }

    let analyzer = QcAnalyzer::new(config.thresholds.clone());
    let worker_count = config.resolved_worker_count();

    let workflow = match (&config.source.directory, args.analysis_only) {
        (Some(directory), false) => {
            info!("Waveform archive: {}", directory.display());
            let archive = Arc::new(DirectoryArchive::new(directory));
            let source: Arc<dyn WaveformSource> = archive.clone();
            let estimator: Arc<dyn SpectralEstimator> = archive;
            let pipeline = ChannelPipeline::new(source, estimator, config.metric_extractor()?)
                .with_max_gap_count(config.resolved_max_gap_count());
            QcWorkflow::new(pool, analyzer, pipeline, worker_count)
        }
        (None, false) => {
            warn!("No waveform archive configured, scoring persisted metrics only");
            QcWorkflow::analysis_only(pool, analyzer, worker_count)
        }
        (_, true) => QcWorkflow::analysis_only(pool, analyzer, worker_count),
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, finishing in-flight stations");
            shutdown.cancel();
        }
    });

    let options = RunOptions {
        start,
        end,
        stations: args.stations,
        flush: args.flush,
    };

    let summary = workflow
        .run(&options, &cancel)
        .await
        .context("QC run failed")?;

    info!(
        "Processed {} day(s): {} scored, {} failed, {} skipped, {} channel(s) defaulted{}",
        summary.days,
        summary.stations_scored,
        summary.stations_failed,
        summary.stations_skipped,
        summary.channels_defaulted,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    Ok(())
}

//! Data collaborators of the channel pipeline
//!
//! Waveform acquisition and spectral estimation are pluggable. The workflow
//! only depends on these traits; [`DirectoryArchive`] is the bundled
//! implementation reading pre-exported JSON files from a local directory.

use crate::db::Station;
use crate::error::QcResult;
use crate::models::{SpectralCurves, Trace};
use async_trait::async_trait;
use sqes_common::DayWindow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provides the waveform of one channel-day
#[async_trait]
pub trait WaveformSource: Send + Sync {
    /// `Ok(None)` when the source simply has no data for the channel
    async fn fetch(&self, station: &Station, channel: &str, day: &DayWindow) -> QcResult<Option<Trace>>;
}

/// Computes PSD curves (and the noise models at their periods) for a trace
///
/// Called from a blocking task, so implementations may do heavy work.
pub trait SpectralEstimator: Send + Sync {
    /// `Ok(None)` when the trace is unsuitable (e.g. too short)
    fn estimate(&self, trace: &Trace, day: &DayWindow) -> QcResult<Option<SpectralCurves>>;
}

/// JSON archive laid out as `{root}/{YYYY-MM-DD}/{NET}.{STA}.{LOC}.{CHA}.{kind}.json`
///
/// `kind` is `trace` for a serialized [`Trace`] and `psd` for serialized
/// [`SpectralCurves`].
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, day: &DayWindow, trace_id: &str, kind: &str) -> PathBuf {
        self.root
            .join(day.date_key())
            .join(format!("{}.{}.json", trace_id, kind))
    }

    /// Path of the trace file for `station`/`channel` on `day`
    pub fn trace_path(&self, station: &Station, channel: &str, day: &DayWindow) -> PathBuf {
        let id = format!(
            "{}.{}.{}.{}",
            station.network, station.code, station.location, channel
        );
        self.file_path(day, &id, "trace")
    }

    /// Path of the PSD file belonging to `trace` on `day`
    pub fn psd_path(&self, trace: &Trace, day: &DayWindow) -> PathBuf {
        self.file_path(day, &trace.id(), "psd")
    }
}

#[async_trait]
impl WaveformSource for DirectoryArchive {
    async fn fetch(&self, station: &Station, channel: &str, day: &DayWindow) -> QcResult<Option<Trace>> {
        let path = self.trace_path(station, channel, day);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No trace file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let trace: Trace = serde_json::from_str(&content)?;
        Ok(Some(trace))
    }
}

impl SpectralEstimator for DirectoryArchive {
    fn estimate(&self, trace: &Trace, day: &DayWindow) -> QcResult<Option<SpectralCurves>> {
        let path = self.psd_path(trace, day);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No PSD file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let curves: SpectralCurves = serde_json::from_str(&content)?;
        Ok(Some(curves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraceSegment;
    use chrono::NaiveDate;

    fn day() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    }

    #[tokio::test]
    async fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DirectoryArchive::new(dir.path());
        let station = Station::new("IA", "ABCD");
        let day = day();

        let trace = Trace {
            network: "IA".to_string(),
            station: "ABCD".to_string(),
            location: String::new(),
            channel: "BHZ".to_string(),
            segments: vec![TraceSegment::new(day.start, 20.0, vec![1.0, 2.0, 3.0])],
        };
        let path = archive.trace_path(&station, "BHZ", &day);
        assert!(path.ends_with("2024-02-29/IA.ABCD..BHZ.trace.json"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_string(&trace).unwrap()).unwrap();

        let loaded = archive.fetch(&station, "BHZ", &day).await.unwrap();
        assert_eq!(loaded, Some(trace.clone()));

        // no PSD exported yet
        assert!(archive.estimate(&trace, &day).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_trace_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DirectoryArchive::new(dir.path());
        let station = Station::new("IA", "ABCD");
        assert!(archive.fetch(&station, "BHN", &day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_trace_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DirectoryArchive::new(dir.path());
        let station = Station::new("IA", "ABCD");
        let path = archive.trace_path(&station, "BHE", &day());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(archive.fetch(&station, "BHE", &day()).await.is_err());
    }
}

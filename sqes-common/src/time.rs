//! Processing-day utilities
//!
//! QC runs are organised by UTC calendar day. A [`DayWindow`] is the
//! half-open interval `[00:00:00, next day 00:00:00)` for one date.

use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};

/// Date format accepted on the command line (e.g. `20240131`)
pub const CLI_DATE_FORMAT: &str = "%Y%m%d";

/// Date format used as the database key (e.g. `2024-01-31`)
pub const DB_DATE_FORMAT: &str = "%Y-%m-%d";

/// One UTC processing day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Build the window covering `date`
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = date
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
            .unwrap_or(start);
        Self { date, start, end }
    }

    /// Window length in seconds
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }

    /// Seconds from the window start to `t` (negative before the window)
    pub fn offset_seconds(&self, t: DateTime<Utc>) -> f64 {
        (t - self.start)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }

    /// Database key for this day
    pub fn date_key(&self) -> String {
        self.date.format(DB_DATE_FORMAT).to_string()
    }
}

/// Parse a `YYYYMMDD` command-line date
pub fn parse_cli_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, CLI_DATE_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("Invalid date '{}' (use YYYYMMDD): {}", value, e)))
}

/// Inclusive list of days between `start` and `end`
///
/// Returns an error when `start` is after `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        return Err(Error::InvalidInput(format!(
            "Start date {} must be before or the same as end date {}",
            start, end
        )));
    }

    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

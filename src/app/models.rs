//! Core data model for the CL61 processing pipeline
//!
//! Defines the requested time window, the per-file slab read from one NetCDF
//! measurement file, and the merged in-memory dataset the later stages operate
//! on. The pipeline is single threaded; each stage takes ownership of the
//! dataset it receives and hands back the transformed value.

use crate::constants::LOG_UNIT_PREFIX;
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use ndarray::Array2;
use std::str::FromStr;

/// Requested measurement window, resolved against wall-clock time once per
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Files whose timestamp falls in the previous clock hour
    LastHour,
    /// Files stamped with the current date
    Today,
    /// Files stamped with yesterday's date
    Yesterday,
}

impl TimeWindow {
    /// Filename token for this window at the given instant.
    ///
    /// `LastHour` yields `YYYYMMDD_HH` of one hour ago; the daily windows
    /// yield a bare `YYYYMMDD`.
    pub fn glob_token(&self, now: NaiveDateTime) -> String {
        match self {
            TimeWindow::LastHour => (now - Duration::hours(1)).format("%Y%m%d_%H").to_string(),
            TimeWindow::Today => now.format("%Y%m%d").to_string(),
            TimeWindow::Yesterday => (now - Duration::days(1)).format("%Y%m%d").to_string(),
        }
    }

    /// Glob pattern matching files in this window.
    ///
    /// The hourly token can sit mid-filename so it is wildcarded on both
    /// sides; the daily token is expected directly before the file pattern.
    /// Adjacent stars are collapsed: the pattern is a single filename
    /// component, and the glob crate rejects a freestanding `**` there.
    pub fn glob_pattern(&self, file_pattern: &str, now: NaiveDateTime) -> String {
        let token = self.glob_token(now);
        let mut pattern = match self {
            TimeWindow::LastHour => format!("*{token}*{file_pattern}"),
            TimeWindow::Today | TimeWindow::Yesterday => format!("*{token}{file_pattern}"),
        };
        while pattern.contains("**") {
            pattern = pattern.replace("**", "*");
        }
        pattern
    }

    /// Canonical name as used by the scheduler configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::LastHour => "last_hour",
            TimeWindow::Today => "today",
            TimeWindow::Yesterday => "yesterday",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "last_hour" => Ok(TimeWindow::LastHour),
            "today" => Ok(TimeWindow::Today),
            "yesterday" => Ok(TimeWindow::Yesterday),
            other => Err(Error::unsupported_window(other)),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded contents of a single CL61 measurement file, the unit the assembler
/// combines along time.
#[derive(Debug, Clone)]
pub struct FileSlab {
    /// Sample timestamps, one per profile
    pub time: Vec<DateTime<Utc>>,
    /// Range gate centres in metres
    pub range: Vec<f64>,
    /// Attenuated backscatter, time x range
    pub beta_att: Array2<f64>,
    /// Units attribute of `beta_att` as read from the file, if present
    pub beta_att_units: Option<String>,
    /// Linear depolarization ratio, time x range
    pub linear_depol_ratio: Array2<f64>,
    /// Cloud layer heights in metres, time x layer; NaN marks no layer
    pub cloud_layer_heights: Array2<f64>,
}

/// Merged, time-sorted dataset spanning all selected files.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub time: Vec<DateTime<Utc>>,
    pub range: Vec<f64>,
    pub beta_att: Array2<f64>,
    pub beta_att_units: Option<String>,
    pub linear_depol_ratio: Array2<f64>,
    pub cloud_layer_heights: Array2<f64>,
}

impl Dataset {
    /// First sample timestamp. Assembly rejects empty inputs, so a merged
    /// dataset always has at least one sample.
    pub fn first_time(&self) -> DateTime<Utc> {
        self.time[0]
    }

    /// Last sample timestamp
    pub fn last_time(&self) -> DateTime<Utc> {
        *self.time.last().expect("dataset has at least one sample")
    }

    /// Number of profiles (time steps)
    pub fn n_times(&self) -> usize {
        self.time.len()
    }

    /// Number of range gates
    pub fn n_ranges(&self) -> usize {
        self.range.len()
    }

    /// Range gate centres converted to km, for plotting
    pub fn range_km(&self) -> Vec<f64> {
        self.range.iter().map(|r| r / 1000.0).collect()
    }

    /// Whether `beta_att` has already been log-scaled, judged by its units
    /// attribute prefix.
    pub fn is_log_scaled(&self) -> bool {
        self.beta_att_units
            .as_deref()
            .is_some_and(|u| u.starts_with(LOG_UNIT_PREFIX))
    }
}

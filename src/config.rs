//! Configuration management and validation
//!
//! Layered configuration for the pipeline: defaults from `constants`,
//! overridden by CLI arguments. The scheduler invokes the binary once per
//! period, so configuration is resolved once at startup and never mutated.

use crate::app::models::TimeWindow;
use crate::constants::{
    DEFAULT_DIR_PATH, DEFAULT_FILE_PATTERN, DEFAULT_PLOT_HEIGHT_KM, DEFAULT_PLOT_SIZE,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Directory searched for measurement files
    pub dir_path: PathBuf,
    /// Filename pattern appended to the window token
    pub file_pattern: String,
    /// Requested time window
    #[serde(skip, default = "default_window")]
    pub window: TimeWindow,
}

fn default_window() -> TimeWindow {
    TimeWindow::LastHour
}

/// Output artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Prefix for the consolidated NetCDF artifact name
    pub file_prefix: String,
    /// Directory the artifacts are written to
    pub output_dir: PathBuf,
    /// Optional spool directory for the host upload agent
    pub spool_dir: Option<PathBuf>,
}

/// Plot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotSettings {
    /// Square figure size in inches
    pub size_in: u32,
    /// Upper height limit of both panels, km
    pub height_km: f64,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub selection: SelectionConfig,
    pub output: OutputConfig,
    pub plot: PlotSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selection: SelectionConfig {
                dir_path: PathBuf::from(DEFAULT_DIR_PATH),
                file_pattern: DEFAULT_FILE_PATTERN.to_string(),
                window: TimeWindow::LastHour,
            },
            output: OutputConfig {
                file_prefix: String::new(),
                output_dir: std::env::temp_dir(),
                spool_dir: None,
            },
            plot: PlotSettings {
                size_in: DEFAULT_PLOT_SIZE,
                height_km: DEFAULT_PLOT_HEIGHT_KM,
            },
        }
    }
}

impl Config {
    /// Validate the resolved configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.selection.dir_path.is_dir() {
            return Err(Error::invalid_directory(
                self.selection.dir_path.display().to_string(),
            ));
        }

        if self.selection.file_pattern.is_empty() {
            return Err(Error::configuration(
                "File pattern must not be empty".to_string(),
            ));
        }

        if self.output.file_prefix.is_empty() {
            return Err(Error::configuration(
                "File prefix must not be empty".to_string(),
            ));
        }

        if self.plot.size_in == 0 || self.plot.size_in > 50 {
            return Err(Error::configuration(format!(
                "Plot size must be between 1 and 50 inches, got {}",
                self.plot.size_in
            )));
        }

        if self.plot.height_km <= 0.0 {
            return Err(Error::configuration(
                "Plot height must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.selection.dir_path = dir.to_path_buf();
        config.output.file_prefix = "crocus-neiu-ceil-a1-".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.selection.dir_path, PathBuf::from("/cl61/"));
        assert_eq!(config.selection.file_pattern, "*.nc");
        assert_eq!(config.selection.window, TimeWindow::LastHour);
        assert_eq!(config.plot.size_in, 8);
        assert_eq!(config.plot.height_km, 8.0);
    }

    #[test]
    fn test_validate_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(valid_config(temp_dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_directory() {
        let mut config = Config::default();
        config.output.file_prefix = "x-".to_string();
        config.selection.dir_path = PathBuf::from("/nonexistent/cl61");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidDirectory { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.output.file_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_plot_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.plot.size_in = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config(temp_dir.path());
        config.plot.height_km = -1.0;
        assert!(config.validate().is_err());
    }
}

//! Command-line argument definitions for the CL61 processor
//!
//! This module defines the CLI interface using the clap derive API. The
//! binary is a single-purpose batch job invoked by an external scheduler, so
//! there are no subcommands; everything is a flag on the one pipeline run.

use crate::app::models::TimeWindow;
use crate::config::Config;
use crate::constants::{
    DEFAULT_DIR_PATH, DEFAULT_FILE_PATTERN, DEFAULT_PLOT_HEIGHT_KM, DEFAULT_PLOT_SIZE,
};
use crate::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the CL61 ceilometer processor
///
/// Merges recently written CL61 NetCDF measurement files into one time-sorted
/// dataset, writes a consolidated NetCDF artifact, renders a two-panel
/// quicklook plot, and hands both to the host publisher for upload.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cl61-processor",
    version,
    about = "Merge, plot and upload CL61 ceilometer NetCDF data for a recent time window"
)]
pub struct Args {
    /// Directory path to search for measurement files
    #[arg(
        long = "dir-path",
        value_name = "PATH",
        default_value = DEFAULT_DIR_PATH,
        help = "Directory path to search for files"
    )]
    pub dir_path: PathBuf,

    /// Filename pattern appended to the window token
    ///
    /// The glob is assembled as `*<token><pattern>` for the daily windows and
    /// `*<token>*<pattern>` for last_hour, so the default of `*.nc` matches
    /// the instrument's `<site>_<YYYYMMDD>_<HHMMSS>.nc` naming.
    #[arg(
        long = "file-pattern",
        value_name = "PATTERN",
        default_value = DEFAULT_FILE_PATTERN,
        help = "File pattern to match"
    )]
    pub file_pattern: String,

    /// Measurement window to process
    #[arg(
        long = "period",
        value_name = "WINDOW",
        value_parser = parse_window,
        default_value = "last_hour",
        help = "today/yesterday/last_hour"
    )]
    pub period: TimeWindow,

    /// Square figure size in inches
    #[arg(
        long = "plot-size",
        alias = "plot_size",
        value_name = "INCHES",
        default_value_t = DEFAULT_PLOT_SIZE,
        help = "Plot size, square"
    )]
    pub plot_size: u32,

    /// Upper height limit of both panels
    #[arg(
        long = "plot-height",
        alias = "plot_height",
        value_name = "KM",
        default_value_t = DEFAULT_PLOT_HEIGHT_KM,
        help = "Plot max height range in km"
    )]
    pub plot_height: f64,

    /// Prefix for the consolidated artifact name and plot title
    ///
    /// Typically the site/data-stream identifier, e.g. `crocus-neiu-ceil-a1-`.
    #[arg(
        long = "file-prefix",
        alias = "file_prefix",
        value_name = "PREFIX",
        help = "Artifact name prefix (e.g. crocus-neiu-ceil-a1-)"
    )]
    pub file_prefix: String,

    /// Directory the artifacts are written to
    ///
    /// Defaults to the system temp directory; the host publisher picks the
    /// files up from there.
    #[arg(long = "output-dir", value_name = "PATH", help = "Artifact output directory")]
    pub output_dir: Option<PathBuf>,

    /// Spool directory for the host upload agent
    ///
    /// When set, events and artifacts are spooled here instead of only being
    /// logged.
    #[arg(long = "spool-dir", value_name = "PATH", help = "Publisher spool directory")]
    pub spool_dir: Option<PathBuf>,

    /// Select and report without writing artifacts or plots
    #[arg(long = "dry-run", help = "Show what would be processed without writing output")]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long = "debug", alias = "DEBUG", help = "Enable debug logging")]
    pub debug: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Window parser for clap, delegating to `TimeWindow::from_str` so the CLI
/// and any other window source accept exactly the same names.
fn parse_window(s: &str) -> std::result::Result<TimeWindow, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

impl Args {
    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() {
            return Err(Error::configuration(
                "File prefix must not be empty".to_string(),
            ));
        }

        if let Some(output_dir) = &self.output_dir {
            if !output_dir.is_dir() {
                return Err(Error::configuration(format!(
                    "Output directory does not exist: {}",
                    output_dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Build the resolved configuration from defaults and these arguments
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        config.selection.dir_path = self.dir_path.clone();
        config.selection.file_pattern = self.file_pattern.clone();
        config.selection.window = self.period;
        config.output.file_prefix = self.file_prefix.clone();
        if let Some(output_dir) = &self.output_dir {
            config.output.output_dir = output_dir.clone();
        }
        config.output.spool_dir = self.spool_dir.clone();
        config.plot.size_in = self.plot_size;
        config.plot.height_km = self.plot_height;
        config
    }

    /// Determine the appropriate log level from the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.debug {
            "debug"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["cl61-processor", "--file-prefix", "crocus-neiu-ceil-a1-"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.dir_path, PathBuf::from("/cl61/"));
        assert_eq!(args.file_pattern, "*.nc");
        assert_eq!(args.period, TimeWindow::LastHour);
        assert_eq!(args.plot_size, 8);
        assert_eq!(args.plot_height, 8.0);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_period_parsing() {
        let args = parse(&["--period", "today"]);
        assert_eq!(args.period, TimeWindow::Today);
        let args = parse(&["--period", "yesterday"]);
        assert_eq!(args.period, TimeWindow::Yesterday);
        let args = parse(&["--period", "last_hour"]);
        assert_eq!(args.period, TimeWindow::LastHour);
    }

    #[test]
    fn test_period_rejects_unknown_window() {
        let result = Args::try_parse_from([
            "cl61-processor",
            "--file-prefix",
            "x-",
            "--period",
            "tomorrow",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_underscore_flag_spellings() {
        // scheduler invocations use the underscore spellings
        let args = Args::try_parse_from([
            "cl61-processor",
            "--file_prefix",
            "crocus-neiu-ceil-a1-",
            "--plot_size",
            "10",
            "--plot_height",
            "12",
            "--DEBUG",
        ])
        .unwrap();
        assert_eq!(args.file_prefix, "crocus-neiu-ceil-a1-");
        assert_eq!(args.plot_size, 10);
        assert_eq!(args.plot_height, 12.0);
        assert!(args.debug);
    }

    #[test]
    fn test_to_config_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap().to_string();
        let args = parse(&[
            "--dir-path",
            &dir,
            "--period",
            "today",
            "--plot-height",
            "15",
            "--output-dir",
            &dir,
        ]);

        let config = args.to_config();
        assert_eq!(config.selection.dir_path, temp_dir.path());
        assert_eq!(config.selection.window, TimeWindow::Today);
        assert_eq!(config.plot.height_km, 15.0);
        assert_eq!(config.output.output_dir, temp_dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_output_dir() {
        let args = parse(&["--output-dir", "/nonexistent/out"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&[]).get_log_level(), "info");
        assert_eq!(parse(&["--debug"]).get_log_level(), "debug");
        assert_eq!(parse(&["-v"]).get_log_level(), "debug");
        assert_eq!(parse(&["-vv"]).get_log_level(), "trace");
        assert_eq!(parse(&["-q"]).get_log_level(), "error");
    }
}

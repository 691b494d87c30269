//! Shared components for the CLI pipeline
//!
//! Logging setup, run statistics, and the final human-readable report used by
//! the process command.

use crate::Result;
use crate::cli::args::Args;
use colored::Colorize;
use tracing::debug;

/// Statistics for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Number of measurement files matched by the window glob
    pub files_selected: usize,
    /// Number of time profiles in the merged dataset
    pub profiles_merged: usize,
    /// Number of range gates per profile
    pub range_gates: usize,
    /// Artifacts written, with their sizes in bytes
    pub artifacts_written: Vec<(String, u64)>,
    /// Number of recoverable errors encountered
    pub errors_encountered: usize,
    /// Total wall-clock time of the run
    pub processing_time: std::time::Duration,
}

impl PipelineStats {
    /// Calculate total artifact size in bytes
    pub fn total_output_size(&self) -> u64 {
        self.artifacts_written.iter().map(|(_, size)| size).sum()
    }

    /// Format a byte count in human-readable form
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

/// Set up structured logging for the pipeline
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    // Create filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cl61_processor={}", log_level)));

    if args.quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        // Standard logging with timestamps
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Print the final run report to stdout
pub fn print_final_report(args: &Args, stats: &PipelineStats) {
    if args.quiet {
        return;
    }

    println!();
    println!("{}", "CL61 processing complete".green().bold());
    println!(
        "  {} {} files, {} profiles x {} range gates",
        "Merged:".cyan(),
        stats.files_selected,
        stats.profiles_merged,
        stats.range_gates
    );
    for (name, size) in &stats.artifacts_written {
        println!(
            "  {} {} ({})",
            "Artifact:".cyan(),
            name,
            PipelineStats::format_size(*size)
        );
    }
    if stats.errors_encountered > 0 {
        println!(
            "  {} {}",
            "Recoverable errors:".yellow(),
            stats.errors_encountered
        );
    }
    println!(
        "  {} {:.2}s",
        "Elapsed:".cyan(),
        stats.processing_time.as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(PipelineStats::format_size(512), "512 B");
        assert_eq!(PipelineStats::format_size(2048), "2.00 KB");
        assert_eq!(PipelineStats::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_total_output_size() {
        let stats = PipelineStats {
            artifacts_written: vec![("a.nc".to_string(), 100), ("b.png".to_string(), 50)],
            ..Default::default()
        };
        assert_eq!(stats.total_output_size(), 150);
    }
}

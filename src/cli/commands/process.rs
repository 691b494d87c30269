//! Pipeline command implementation
//!
//! Orchestrates one scheduled run: select recent measurement files, merge
//! them into a single time-sorted dataset, write the consolidated NetCDF
//! artifact, render the quicklook plot, and publish both through the host
//! interface.

use super::shared::{PipelineStats, print_final_report, setup_logging};
use crate::app::services::plot_renderer::{self, PlotConfig};
use crate::app::services::publisher::{DirectoryPublisher, LogPublisher, Publisher};
use crate::app::services::{artifact_writer, dataset_assembler, file_selector};
use crate::cli::args::Args;
use crate::config::Config;
use crate::{Error, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Run the full processing pipeline for the configured time window
///
/// The run succeeds (exit 0) even when the window matched no files; the host
/// is notified through an `error` event and the scheduler tries again on the
/// next invocation. A plot render timeout is likewise recoverable: the
/// NetCDF artifact is still uploaded and the failure is reported.
pub async fn run_process(args: Args) -> Result<PipelineStats> {
    let start_time = Instant::now();

    // Set up logging
    setup_logging(&args)?;

    info!("Starting CL61 processor");
    debug!("Command line arguments: {:?}", args);

    // Validate arguments and build the run configuration
    args.validate()?;
    let config = args.to_config();
    config.validate()?;
    debug!("Resolved configuration: {:?}", config);

    let publisher = build_publisher(&config)?;

    let mut stats = PipelineStats::default();

    // Select the files the window glob matches
    let files = file_selector::select(
        &config.selection.dir_path,
        &config.selection.file_pattern,
        config.selection.window,
    )?;
    stats.files_selected = files.len();

    if files.is_empty() {
        warn!(
            "No recent files found in {} for window {}",
            config.selection.dir_path.display(),
            config.selection.window
        );
        publisher.publish("error", "No recent files found.")?;
        stats.processing_time = start_time.elapsed();
        return Ok(stats);
    }

    info!("Found {} recent files", files.len());
    publisher.publish("status", &format!("Found {} recent files.", files.len()))?;

    if args.dry_run {
        return run_dry_run(&files, stats, start_time);
    }

    // Merge, sort and log-scale
    let Some(dataset) = dataset_assembler::assemble(&files)? else {
        // Unreachable with a non-empty selection, but keep the exit path
        // consistent with the empty-window case.
        publisher.publish("error", "No recent files found.")?;
        stats.processing_time = start_time.elapsed();
        return Ok(stats);
    };
    stats.profiles_merged = dataset.n_times();
    stats.range_gates = dataset.n_ranges();
    info!(
        "Merged dataset: {} profiles x {} range gates, {} - {}",
        dataset.n_times(),
        dataset.n_ranges(),
        dataset.first_time(),
        dataset.last_time()
    );

    // Write the consolidated NetCDF artifact
    let nc_path = match artifact_writer::write(
        &dataset,
        &config.output.file_prefix,
        &config.output.output_dir,
    ) {
        Ok(path) => path,
        Err(e) => {
            publisher.publish("error", &format!("Artifact writing failed: {}", e))?;
            return Err(e);
        }
    };
    record_artifact(&mut stats, &nc_path);

    // Render the quicklook plot; a timeout is recoverable
    let plot_config = PlotConfig {
        size_in: config.plot.size_in,
        height_km: config.plot.height_km,
        file_prefix: config.output.file_prefix.clone(),
        period: config.selection.window.as_str().to_string(),
    };
    let png_path = match plot_renderer::render(dataset, plot_config, &config.output.output_dir)
        .await
    {
        Ok(path) => Some(path),
        Err(e @ Error::RenderTimeout { .. }) => {
            error!("Plot rendering failed: {}", e);
            publisher.publish("error", &format!("Plot rendering failed: {}", e))?;
            stats.errors_encountered += 1;
            None
        }
        Err(e) => {
            publisher.publish("error", &format!("Plot rendering failed: {}", e))?;
            return Err(e);
        }
    };
    if let Some(path) = &png_path {
        record_artifact(&mut stats, path);
    }

    // Hand the artifacts to the host upload agent
    publisher.upload_file(&nc_path)?;
    info!("Uploaded {}", nc_path.display());
    if let Some(path) = &png_path {
        publisher.upload_file(path)?;
        info!("Uploaded {}", path.display());
    }

    stats.processing_time = start_time.elapsed();
    print_final_report(&args, &stats);

    Ok(stats)
}

/// Report what a run would do without writing artifacts
fn run_dry_run(
    files: &[std::path::PathBuf],
    mut stats: PipelineStats,
    start_time: Instant,
) -> Result<PipelineStats> {
    info!("Performing dry run - no artifacts will be written");
    for file in files {
        info!("Would merge: {}", file.display());
    }
    info!("Dry run complete: {} files would be processed", files.len());
    stats.processing_time = start_time.elapsed();
    Ok(stats)
}

/// Build the publisher from the run configuration
fn build_publisher(config: &Config) -> Result<Box<dyn Publisher>> {
    match &config.output.spool_dir {
        Some(spool_dir) => {
            info!("Publishing to spool directory {}", spool_dir.display());
            Ok(Box::new(DirectoryPublisher::new(spool_dir.clone())?))
        }
        None => {
            debug!("No spool directory configured, publishing to the log only");
            Ok(Box::new(LogPublisher))
        }
    }
}

fn record_artifact(stats: &mut PipelineStats, path: &Path) {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    stats.artifacts_written.push((name, size));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_publisher_defaults_to_log() {
        let config = Config::default();
        assert!(build_publisher(&config).is_ok());
    }

    #[test]
    fn test_build_publisher_creates_spool_dir() {
        let temp_dir = TempDir::new().unwrap();
        let spool = temp_dir.path().join("spool");

        let mut config = Config::default();
        config.output.spool_dir = Some(spool.clone());

        let publisher = build_publisher(&config).unwrap();
        assert!(spool.is_dir());
        publisher.publish("status", "hello").unwrap();
        assert!(spool.join("events.log").is_file());
    }

    #[test]
    fn test_record_artifact_reads_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("artifact.nc");
        std::fs::write(&path, b"12345").unwrap();

        let mut stats = PipelineStats::default();
        record_artifact(&mut stats, &path);

        assert_eq!(stats.artifacts_written, vec![("artifact.nc".to_string(), 5)]);
    }
}

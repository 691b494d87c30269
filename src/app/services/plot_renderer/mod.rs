//! Two-panel quicklook rendering for the assembled dataset
//!
//! Produces a stacked figure sharing the time axis: attenuated backscatter
//! (PuBuGn, robust color scaling) over linear depolarization ratio
//! (Spectral_r, fixed [0, 0.7]), both overlaid with cloud-layer tick marks and
//! clipped to [0, plot_height] km. Rendering runs on a blocking worker under a
//! hard wall-clock deadline; a timed-out render leaves no valid output behind.

pub mod colormap;
pub mod overlay;

use crate::app::models::Dataset;
use crate::constants::{
    DEPOL_VMAX, DEPOL_VMIN, PLOT_DPI, RENDER_TIMEOUT_SECS, ROBUST_PERCENTILE_HIGH,
    ROBUST_PERCENTILE_LOW,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use colormap::{robust_limits, Colormap};
use ndarray::Array2;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Figure parameters carried from the CLI configuration.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    /// Square figure size in inches
    pub size_in: u32,
    /// Upper height limit of both panels, km
    pub height_km: f64,
    /// Title prefix (site/file prefix)
    pub file_prefix: String,
    /// Window name shown in the title
    pub period: String,
}

/// Render the quicklook figure to `output_dir`, named from the dataset's last
/// timestamp. Fails with `RenderTimeout` after the wall-clock deadline, in
/// which case any partial file is removed.
pub async fn render(dataset: Dataset, config: PlotConfig, output_dir: &Path) -> Result<PathBuf> {
    render_with_deadline(
        dataset,
        config,
        output_dir,
        Duration::from_secs(RENDER_TIMEOUT_SECS),
    )
    .await
}

/// As `render`, with an explicit deadline.
pub async fn render_with_deadline(
    dataset: Dataset,
    config: PlotConfig,
    output_dir: &Path,
    deadline: Duration,
) -> Result<PathBuf> {
    let plot_path = output_dir.join(format!(
        "cl61_plot_{}.png",
        dataset.last_time().format("%Y-%m-%dT%H:%M:%S")
    ));
    info!("plotting to {}", plot_path.display());

    finish_within(deadline, &plot_path, move |staging| {
        render_figure(&dataset, &config, staging)
    })
    .await?;
    Ok(plot_path)
}

/// Run a blocking draw under a wall-clock deadline.
///
/// The worker draws into a staging file and renames it to `plot_path` only on
/// success; a timed-out run removes the staging file and never produces
/// `plot_path`. The cancellation flag covers the detached worker: a worker
/// that finishes after the deadline discards its own staging file instead of
/// renaming it.
async fn finish_within<F>(deadline: Duration, plot_path: &Path, draw: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()> + Send + 'static,
{
    let staging = plot_path.with_extension("png.partial");
    let cancelled = Arc::new(AtomicBool::new(false));

    let worker_cancelled = Arc::clone(&cancelled);
    let worker_staging = staging.clone();
    let worker_target = plot_path.to_path_buf();
    let task = tokio::task::spawn_blocking(move || -> Result<()> {
        draw(&worker_staging)?;
        if worker_cancelled.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&worker_staging);
            return Ok(());
        }
        std::fs::rename(&worker_staging, &worker_target)
            .map_err(|e| Error::rendering(format!("failed to move finished plot: {e}")))?;
        // Re-check after the rename: if the deadline fired in between, the
        // timeout arm's removal may have run before the rename landed.
        if worker_cancelled.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&worker_target);
        }
        Ok(())
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(joined) => {
            joined.map_err(|e| Error::rendering(format!("render worker panicked: {e}")))??;
            Ok(())
        }
        Err(_) => {
            cancelled.store(true, Ordering::SeqCst);
            warn!(
                "plot rendering exceeded {:.0?} deadline, discarding output",
                deadline
            );
            let _ = std::fs::remove_file(&staging);
            let _ = std::fs::remove_file(plot_path);
            Err(Error::render_timeout(deadline.as_secs()))
        }
    }
}

/// Synchronous figure rendering. Split out so the deadline wrapper and tests
/// can call it directly.
pub fn render_figure(dataset: &Dataset, config: &PlotConfig, path: &Path) -> Result<()> {
    let px = config.size_in * PLOT_DPI;
    let root = BitMapBackend::new(path, (px, px)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| Error::rendering(e.to_string()))?;

    let (title_area, panels_area) = root.split_vertically(30);
    let title = format!(
        "{}{} {}",
        config.file_prefix,
        config.period,
        dataset.first_time().format("%Y-%m-%dT%H:%M:%S")
    );
    title_area
        .titled(&title, ("sans-serif", 18))
        .map_err(|e| Error::rendering(e.to_string()))?;

    let half = (panels_area.dim_in_pixel().1 / 2) as i32;
    let (top, bottom) = panels_area.split_vertically(half);

    let first = dataset.first_time();
    let cloud_points = overlay::cloud_points(&dataset.time, &dataset.cloud_layer_heights);

    let beta_limits = robust_limits(
        dataset.beta_att.iter().copied(),
        ROBUST_PERCENTILE_LOW,
        ROBUST_PERCENTILE_HIGH,
    );
    draw_panel(
        &top,
        dataset,
        &dataset.beta_att,
        "Attenuated Volume Backscatter Coefficient",
        Colormap::pubugn(),
        beta_limits,
        config.height_km,
        first,
        &cloud_points,
    )?;

    draw_panel(
        &bottom,
        dataset,
        &dataset.linear_depol_ratio,
        "Linear Depolarization Ratio",
        Colormap::spectral_r(),
        (DEPOL_VMIN, DEPOL_VMAX),
        config.height_km,
        first,
        &cloud_points,
    )?;

    root.present().map_err(|e| Error::rendering(e.to_string()))?;
    Ok(())
}

/// Hours since the first sample, the shared x coordinate of both panels.
fn hours_since(first: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - first).num_milliseconds() as f64 / 3_600_000.0
}

#[allow(clippy::too_many_arguments)]
fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    dataset: &Dataset,
    values: &Array2<f64>,
    caption: &str,
    cmap: Colormap,
    (vmin, vmax): (f64, f64),
    height_km: f64,
    first: DateTime<Utc>,
    cloud_points: &[(DateTime<Utc>, f64)],
) -> Result<()> {
    let x_max = hours_since(first, dataset.last_time()).max(1e-3);
    let range_km = dataset.range_km();

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_max, 0.0..height_km)
        .map_err(|e| Error::rendering(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Time [UTC]")
        .y_desc("Height [km]")
        .x_labels(8)
        .x_label_formatter(&|x| {
            (first + chrono::Duration::milliseconds((x * 3_600_000.0) as i64))
                .format("%H:%M")
                .to_string()
        })
        .y_label_formatter(&|y| format!("{y:.1}"))
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(|e| Error::rendering(e.to_string()))?;

    // Cell edges at midpoints between sample times / range gates
    let x_edges = edges(&dataset.time.iter().map(|t| hours_since(first, *t)).collect::<Vec<_>>());
    let y_edges = edges(&range_km);
    let span = vmax - vmin;

    chart
        .draw_series(values.indexed_iter().filter_map(|((i, j), v)| {
            if y_edges[j] > height_km || !v.is_finite() {
                return None;
            }
            let color = cmap.sample((v - vmin) / span);
            Some(Rectangle::new(
                [
                    (x_edges[i], y_edges[j]),
                    (x_edges[i + 1], y_edges[j + 1].min(height_km)),
                ],
                color.filled(),
            ))
        }))
        .map_err(|e| Error::rendering(e.to_string()))?;

    // Cloud layer heights as small tick marks
    chart
        .draw_series(
            cloud_points
                .iter()
                .filter(|(_, h)| *h <= height_km)
                .map(|(t, h)| Circle::new((hours_since(first, *t), *h), 1, BLACK.filled())),
        )
        .map_err(|e| Error::rendering(e.to_string()))?;

    Ok(())
}

/// Cell edges bracketing each coordinate at the midpoints to its neighbours.
fn edges(centers: &[f64]) -> Vec<f64> {
    match centers.len() {
        0 => vec![0.0, 1.0],
        1 => {
            let c = centers[0];
            vec![c - 0.5, c + 0.5]
        }
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            for w in centers.windows(2) {
                edges.push((w[0] + w[1]) / 2.0);
            }
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

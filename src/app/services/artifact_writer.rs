//! Serialization of the assembled dataset to a consolidated NetCDF artifact
//!
//! The time coordinate is re-encoded as float64 seconds since midnight of the
//! first sample's date, calendar "standard". The artifact is named
//! `<prefix><YYYYMMDD-HH>0000.nc` after the first sample.

use crate::app::models::Dataset;
use crate::constants::{VAR_BETA_ATT, VAR_CLOUD_HEIGHTS, VAR_LINEAR_DEPOL, VAR_RANGE, VAR_TIME};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the dataset to `<output_dir>/<file_prefix><YYYYMMDD-HH>0000.nc` and
/// return the written path.
pub fn write(dataset: &Dataset, file_prefix: &str, output_dir: &Path) -> Result<PathBuf> {
    let first = dataset.first_time();
    let date_token = first.format("%Y%m%d-%H").to_string();
    let output_path = output_dir.join(format!("{file_prefix}{date_token}0000.nc"));

    // Seconds since midnight of the first sample's date
    let midnight = first
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always representable");
    let time_units = format!("seconds since {} 00:00:00", first.format("%Y-%m-%d"));
    let time_values: Vec<f64> = dataset
        .time
        .iter()
        .map(|t| (t.naive_utc() - midnight).num_milliseconds() as f64 / 1000.0)
        .collect();

    info!("Writing consolidated dataset to {}", output_path.display());
    write_file(dataset, &output_path, &time_units, &time_values)
        .map_err(|e| Error::artifact_writing(output_path.display().to_string(), Some(e)))?;

    Ok(output_path)
}

fn write_file(
    dataset: &Dataset,
    path: &Path,
    time_units: &str,
    time_values: &[f64],
) -> std::result::Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    let n_time = dataset.n_times();
    let n_range = dataset.n_ranges();
    let n_layers = dataset.cloud_layer_heights.ncols();

    file.add_dimension(VAR_TIME, n_time)?;
    file.add_dimension(VAR_RANGE, n_range)?;
    file.add_dimension("layer", n_layers)?;

    {
        let mut var = file.add_variable::<f64>(VAR_TIME, &[VAR_TIME])?;
        var.put_attribute("standard_name", "time")?;
        var.put_attribute("units", time_units)?;
        var.put_attribute("calendar", "standard")?;
        var.put_values(time_values, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>(VAR_RANGE, &[VAR_RANGE])?;
        var.put_attribute("long_name", "range from instrument")?;
        var.put_attribute("units", "m")?;
        var.put_values(&dataset.range, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>(VAR_BETA_ATT, &[VAR_TIME, VAR_RANGE])?;
        var.put_attribute("long_name", "attenuated volume backscatter coefficient")?;
        if let Some(units) = &dataset.beta_att_units {
            var.put_attribute("units", units.as_str())?;
        }
        var.put_values(
            dataset.beta_att.as_slice().expect("row-major array"),
            ..,
        )?;
    }

    {
        let mut var = file.add_variable::<f64>(VAR_LINEAR_DEPOL, &[VAR_TIME, VAR_RANGE])?;
        var.put_attribute("long_name", "linear depolarization ratio")?;
        var.put_values(
            dataset.linear_depol_ratio.as_slice().expect("row-major array"),
            ..,
        )?;
    }

    {
        let mut var = file.add_variable::<f64>(VAR_CLOUD_HEIGHTS, &[VAR_TIME, "layer"])?;
        var.put_attribute("long_name", "cloud layer heights")?;
        var.put_attribute("units", "m")?;
        var.put_values(
            dataset
                .cloud_layer_heights
                .as_slice()
                .expect("row-major array"),
            ..,
        )?;
    }

    file.add_attribute("source", "cl61_processor")?;
    file.add_attribute(
        "history",
        format!(
            "{}: merged from CL61 measurement files",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
        .as_str(),
    )?;

    Ok(())
}

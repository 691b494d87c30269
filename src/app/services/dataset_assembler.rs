//! Assembly of per-file CL61 NetCDF output into one time-sorted dataset
//!
//! Opens every selected file, concatenates the profiles along the time
//! dimension (a nested combine: files only need to agree on the range grid,
//! cloud-layer columns are padded to the widest file), sorts the result by the
//! time coordinate, and log-scales the attenuated backscatter in place.

use crate::app::models::{Dataset, FileSlab};
use crate::constants::{
    BETA_ATT_FLOOR, LOG_UNIT_PREFIX, VAR_BETA_ATT, VAR_CLOUD_HEIGHTS, VAR_LINEAR_DEPOL, VAR_RANGE,
    VAR_TIME,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ndarray::{Array2, Axis};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Open the selected files as one merged, time-sorted dataset with `beta_att`
/// log-scaled. Returns `None` for an empty selection.
pub fn assemble(paths: &[PathBuf]) -> Result<Option<Dataset>> {
    if paths.is_empty() {
        warn!("No recent NetCDF files found for plotting.");
        return Ok(None);
    }

    info!("Reading {} files into a combined dataset", paths.len());
    let mut slabs = Vec::with_capacity(paths.len());
    for path in paths {
        slabs.push(read_slab(path)?);
    }

    let mut dataset = combine_slabs(slabs)?;
    sort_by_time(&mut dataset);
    log_scale_beta(&mut dataset);

    debug!(
        "Assembled dataset: {} profiles x {} range gates, {} .. {}",
        dataset.n_times(),
        dataset.n_ranges(),
        dataset.first_time(),
        dataset.last_time()
    );
    Ok(Some(dataset))
}

/// Read one measurement file into a slab.
pub fn read_slab(path: &Path) -> Result<FileSlab> {
    let name = path.display().to_string();
    let file = netcdf::open(path)
        .map_err(|e| Error::assembly(&name, "failed to open NetCDF file", Some(e)))?;

    let time_var = file
        .variable(VAR_TIME)
        .ok_or_else(|| Error::assembly(&name, "missing 'time' variable", None))?;
    let time_raw: Vec<f64> = time_var
        .get_values(..)
        .map_err(|e| Error::assembly(&name, "failed to read 'time'", Some(e)))?;
    let time_units = string_attribute(&time_var, "units");
    let time = decode_cf_time(time_units.as_deref(), &time_raw)?;

    let range: Vec<f64> = file
        .variable(VAR_RANGE)
        .ok_or_else(|| Error::assembly(&name, "missing 'range' variable", None))?
        .get_values(..)
        .map_err(|e| Error::assembly(&name, "failed to read 'range'", Some(e)))?;

    let n_time = time.len();
    let n_range = range.len();

    let (beta_att, beta_att_units) =
        read_profile_var(&file, VAR_BETA_ATT, &name, n_time, n_range)?;
    let (linear_depol_ratio, _) =
        read_profile_var(&file, VAR_LINEAR_DEPOL, &name, n_time, n_range)?;
    let cloud_layer_heights = read_cloud_heights(&file, &name, n_time)?;

    Ok(FileSlab {
        time,
        range,
        beta_att,
        beta_att_units,
        linear_depol_ratio,
        cloud_layer_heights,
    })
}

/// Concatenate slabs along time. Files must share the range grid; cloud-layer
/// columns are padded with NaN to the widest file.
pub fn combine_slabs(slabs: Vec<FileSlab>) -> Result<Dataset> {
    let mut iter = slabs.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::assembly("<none>", "no slabs to combine", None))?;

    let range = first.range;
    let beta_att_units = first.beta_att_units;
    let max_layers = first.cloud_layer_heights.ncols();

    let mut time = first.time;
    let mut beta = first.beta_att;
    let mut depol = first.linear_depol_ratio;
    let mut clouds = vec![first.cloud_layer_heights];

    for slab in iter {
        if slab.range.len() != range.len()
            || slab
                .range
                .iter()
                .zip(range.iter())
                .any(|(a, b)| (a - b).abs() > 1e-6)
        {
            return Err(Error::assembly(
                "<combined>",
                format!(
                    "range grid mismatch: {} gates vs {} gates",
                    slab.range.len(),
                    range.len()
                ),
                None,
            ));
        }

        time.extend(slab.time);
        beta.append(Axis(0), slab.beta_att.view())
            .map_err(|e| Error::assembly("<combined>", format!("beta_att concat: {e}"), None))?;
        depol
            .append(Axis(0), slab.linear_depol_ratio.view())
            .map_err(|e| {
                Error::assembly("<combined>", format!("linear_depol_ratio concat: {e}"), None)
            })?;
        clouds.push(slab.cloud_layer_heights);
    }

    let max_layers = clouds
        .iter()
        .map(|c| c.ncols())
        .fold(max_layers, usize::max);
    let n_time = time.len();
    let mut cloud_layer_heights = Array2::from_elem((n_time, max_layers), f64::NAN);
    let mut row = 0;
    for block in clouds {
        for src in block.rows() {
            for (j, v) in src.iter().enumerate() {
                cloud_layer_heights[[row, j]] = *v;
            }
            row += 1;
        }
    }

    Ok(Dataset {
        time,
        range,
        beta_att: beta,
        beta_att_units,
        linear_depol_ratio: depol,
        cloud_layer_heights,
    })
}

/// Stable sort of all time-indexed arrays by the time coordinate.
pub fn sort_by_time(dataset: &mut Dataset) {
    let mut order: Vec<usize> = (0..dataset.time.len()).collect();
    order.sort_by_key(|&i| dataset.time[i]);

    if order.windows(2).all(|w| w[0] < w[1]) {
        return; // already sorted
    }

    dataset.time = order.iter().map(|&i| dataset.time[i]).collect();
    dataset.beta_att = dataset.beta_att.select(Axis(0), &order);
    dataset.linear_depol_ratio = dataset.linear_depol_ratio.select(Axis(0), &order);
    dataset.cloud_layer_heights = dataset.cloud_layer_heights.select(Axis(0), &order);
}

/// Clamp non-positive backscatter to the floor, take log10, and rewrite the
/// units attribute. A no-op when the units already carry the log prefix, so
/// re-running the assembler on its own artifact cannot double-apply.
pub fn log_scale_beta(dataset: &mut Dataset) {
    if dataset.is_log_scaled() {
        debug!("beta_att already log-scaled, leaving untouched");
        return;
    }

    dataset.beta_att.mapv_inplace(|v| {
        if v > 0.0 {
            v.log10()
        } else {
            BETA_ATT_FLOOR.log10()
        }
    });

    dataset.beta_att_units = Some(match &dataset.beta_att_units {
        Some(units) => format!("{LOG_UNIT_PREFIX}{units})"),
        None => format!("{LOG_UNIT_PREFIX}unknown)"),
    });
}

/// Read a time x range variable and its units attribute.
fn read_profile_var(
    file: &netcdf::File,
    var_name: &str,
    file_name: &str,
    n_time: usize,
    n_range: usize,
) -> Result<(Array2<f64>, Option<String>)> {
    let var = file.variable(var_name).ok_or_else(|| {
        Error::assembly(file_name, format!("missing '{var_name}' variable"), None)
    })?;
    let flat: Vec<f64> = var
        .get_values(..)
        .map_err(|e| Error::assembly(file_name, format!("failed to read '{var_name}'"), Some(e)))?;
    let array = Array2::from_shape_vec((n_time, n_range), flat).map_err(|_| {
        Error::assembly(
            file_name,
            format!("'{var_name}' does not have time x range shape"),
            None,
        )
    })?;
    Ok((array, string_attribute(&var, "units")))
}

/// Read cloud layer heights, accepting either a (time, layer) array or a
/// single-layer (time,) vector.
fn read_cloud_heights(file: &netcdf::File, file_name: &str, n_time: usize) -> Result<Array2<f64>> {
    let var = file.variable(VAR_CLOUD_HEIGHTS).ok_or_else(|| {
        Error::assembly(
            file_name,
            format!("missing '{VAR_CLOUD_HEIGHTS}' variable"),
            None,
        )
    })?;
    let flat: Vec<f64> = var.get_values(..).map_err(|e| {
        Error::assembly(
            file_name,
            format!("failed to read '{VAR_CLOUD_HEIGHTS}'"),
            Some(e),
        )
    })?;

    if n_time == 0 || flat.len() % n_time != 0 {
        return Err(Error::assembly(
            file_name,
            format!("'{VAR_CLOUD_HEIGHTS}' length {} does not divide into {n_time} profiles", flat.len()),
            None,
        ));
    }
    let n_layers = flat.len() / n_time;
    // Fill values read back as huge floats; normalize to NaN
    let flat: Vec<f64> = flat
        .into_iter()
        .map(|v| if v.is_finite() && v.abs() < 1.0e30 { v } else { f64::NAN })
        .collect();
    Array2::from_shape_vec((n_time, n_layers), flat).map_err(|_| {
        Error::assembly(
            file_name,
            format!("'{VAR_CLOUD_HEIGHTS}' has unexpected shape"),
            None,
        )
    })
}

/// Fetch a string attribute from a variable, if present.
fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

/// Decode a CF-style time coordinate (`<unit> since <reference>`) into UTC
/// timestamps. Values without a units attribute are taken as seconds since
/// the Unix epoch.
pub fn decode_cf_time(units: Option<&str>, values: &[f64]) -> Result<Vec<DateTime<Utc>>> {
    let (scale, reference) = match units {
        Some(units) => parse_time_units(units)?,
        None => (1.0, Utc.timestamp_opt(0, 0).unwrap()),
    };

    Ok(values
        .iter()
        .map(|v| {
            let micros = (v * scale * 1e6).round() as i64;
            reference + chrono::Duration::microseconds(micros)
        })
        .collect())
}

/// Parse `"<unit> since <reference>"` into a seconds-per-unit scale and a UTC
/// reference instant.
fn parse_time_units(units: &str) -> Result<(f64, DateTime<Utc>)> {
    let mut parts = units.splitn(2, " since ");
    let unit = parts
        .next()
        .ok_or_else(|| Error::datetime_parsing(format!("bad time units: '{units}'")))?
        .trim();
    let reference = parts
        .next()
        .ok_or_else(|| Error::datetime_parsing(format!("time units missing reference: '{units}'")))?
        .trim();

    let scale = match unit {
        "seconds" | "second" | "s" => 1.0,
        "milliseconds" | "millisecond" | "ms" => 1e-3,
        "minutes" | "minute" | "min" => 60.0,
        "hours" | "hour" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => {
            return Err(Error::datetime_parsing(format!(
                "unsupported time unit '{other}'"
            )))
        }
    };

    let reference = parse_reference_datetime(reference)?;
    Ok((scale, reference))
}

fn parse_reference_datetime(s: &str) -> Result<DateTime<Utc>> {
    // Strip a trailing UTC marker; CL61 output does not use offsets
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z').trim();

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d",
    ];
    for format in FORMATS {
        if *format == "%Y-%m-%d" {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    Err(Error::datetime_parsing(format!(
        "unparseable time reference '{s}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn slab(times: &[i64], beta: Array2<f64>, layers: Array2<f64>) -> FileSlab {
        let depol = Array2::zeros(beta.raw_dim());
        FileSlab {
            time: times.iter().map(|&s| t(s)).collect(),
            range: (0..beta.ncols()).map(|i| i as f64 * 5.0).collect(),
            beta_att: beta,
            beta_att_units: Some("sr-1 m-1".to_string()),
            linear_depol_ratio: depol,
            cloud_layer_heights: layers,
        }
    }

    #[test]
    fn test_assemble_empty_is_none() {
        assert!(assemble(&[]).unwrap().is_none());
    }

    #[test]
    fn test_combine_concatenates_along_time() {
        let a = slab(&[0, 60], array![[1.0, 2.0], [3.0, 4.0]], Array2::zeros((2, 1)));
        let b = slab(&[120], array![[5.0, 6.0]], Array2::zeros((1, 1)));
        let ds = combine_slabs(vec![a, b]).unwrap();
        assert_eq!(ds.n_times(), 3);
        assert_eq!(ds.beta_att, array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    }

    #[test]
    fn test_combine_pads_cloud_layers() {
        let a = slab(&[0], array![[1.0]], array![[100.0]]);
        let b = slab(&[60], array![[2.0]], array![[200.0, 1500.0, 4000.0]]);
        let ds = combine_slabs(vec![a, b]).unwrap();
        assert_eq!(ds.cloud_layer_heights.dim(), (2, 3));
        assert_eq!(ds.cloud_layer_heights[[0, 0]], 100.0);
        assert!(ds.cloud_layer_heights[[0, 1]].is_nan());
        assert!(ds.cloud_layer_heights[[0, 2]].is_nan());
        assert_eq!(ds.cloud_layer_heights[[1, 2]], 4000.0);
    }

    #[test]
    fn test_combine_rejects_range_mismatch() {
        let a = slab(&[0], array![[1.0, 2.0]], Array2::zeros((1, 1)));
        let b = slab(&[60], array![[1.0, 2.0, 3.0]], Array2::zeros((1, 1)));
        assert!(matches!(
            combine_slabs(vec![a, b]),
            Err(Error::Assembly { .. })
        ));
    }

    #[test]
    fn test_sort_by_time_reorders_rows() {
        let a = slab(&[120], array![[3.0]], array![[300.0]]);
        let b = slab(&[0], array![[1.0]], array![[100.0]]);
        let c = slab(&[60], array![[2.0]], array![[200.0]]);
        let mut ds = combine_slabs(vec![a, b, c]).unwrap();
        sort_by_time(&mut ds);

        assert_eq!(ds.time, vec![t(0), t(60), t(120)]);
        assert_eq!(ds.beta_att, array![[1.0], [2.0], [3.0]]);
        assert_eq!(ds.cloud_layer_heights, array![[100.0], [200.0], [300.0]]);
        assert!(ds.time.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_log_scale_beta_values_and_units() {
        let mut ds = combine_slabs(vec![slab(
            &[0],
            array![[1e-5, 0.0, -3.0, 1.0]],
            Array2::zeros((1, 1)),
        )])
        .unwrap();
        log_scale_beta(&mut ds);

        let floor = BETA_ATT_FLOOR.log10();
        assert_eq!(ds.beta_att[[0, 0]], 1e-5f64.log10());
        assert_eq!(ds.beta_att[[0, 1]], floor);
        assert_eq!(ds.beta_att[[0, 2]], floor);
        assert_eq!(ds.beta_att[[0, 3]], 0.0);
        assert_eq!(ds.beta_att_units.as_deref(), Some("log(sr-1 m-1)"));
    }

    #[test]
    fn test_log_scale_beta_without_units() {
        let mut ds = combine_slabs(vec![slab(&[0], array![[1.0]], Array2::zeros((1, 1)))]).unwrap();
        ds.beta_att_units = None;
        log_scale_beta(&mut ds);
        assert_eq!(ds.beta_att_units.as_deref(), Some("log(unknown)"));
    }

    #[test]
    fn test_log_scale_beta_is_guarded_against_reapplication() {
        let mut ds = combine_slabs(vec![slab(&[0], array![[1e-5]], Array2::zeros((1, 1)))]).unwrap();
        log_scale_beta(&mut ds);
        let once = ds.clone();
        log_scale_beta(&mut ds);
        assert_eq!(ds.beta_att, once.beta_att);
        assert_eq!(ds.beta_att_units, once.beta_att_units);
    }

    #[test]
    fn test_decode_cf_time_seconds_since() {
        let times =
            decode_cf_time(Some("seconds since 2025-04-29 00:00:00"), &[0.0, 3600.0]).unwrap();
        assert_eq!(times[0].to_rfc3339(), "2025-04-29T00:00:00+00:00");
        assert_eq!(times[1].to_rfc3339(), "2025-04-29T01:00:00+00:00");
    }

    #[test]
    fn test_decode_cf_time_days_since_epoch() {
        let times = decode_cf_time(Some("days since 1970-01-01"), &[1.5]).unwrap();
        assert_eq!(times[0].to_rfc3339(), "1970-01-02T12:00:00+00:00");
    }

    #[test]
    fn test_decode_cf_time_without_units_is_unix_seconds() {
        let times = decode_cf_time(None, &[86400.0]).unwrap();
        assert_eq!(times[0].to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_decode_cf_time_rejects_unknown_unit() {
        assert!(decode_cf_time(Some("fortnights since 1970-01-01"), &[1.0]).is_err());
    }
}

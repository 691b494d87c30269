//! Selection of recently written CL61 measurement files
//!
//! Builds a glob from the requested time window and the configured filename
//! pattern, assuming filenames carry a `YYYYMMDD_HHMMSS`-style timestamp. An
//! empty match is a normal outcome meaning "nothing to do", not an error.

use crate::app::models::TimeWindow;
use crate::{Error, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Select measurement files under `directory` whose timestamp falls in the
/// given window, sorted ascending by path.
pub fn select(directory: &Path, file_pattern: &str, window: TimeWindow) -> Result<Vec<PathBuf>> {
    select_at(directory, file_pattern, window, Local::now().naive_local())
}

/// Window resolution against an explicit instant. `select` passes the current
/// local time; tests pass fixed instants.
pub fn select_at(
    directory: &Path,
    file_pattern: &str,
    window: TimeWindow,
    now: chrono::NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::invalid_directory(directory.display().to_string()));
    }

    let pattern = directory
        .join(window.glob_pattern(file_pattern, now))
        .display()
        .to_string();
    info!("Searching files with pattern: {}", pattern);

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(|entry| entry.ok()).collect();
    files.sort();

    debug!("Matched {} files", files.len());
    for file in &files {
        debug!("  Found: {}", file.display());
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use tempfile::TempDir;

    fn noon(y: i32, mo: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_invalid_directory() {
        let result = select(
            Path::new("/nonexistent/cl61"),
            "*.nc",
            TimeWindow::LastHour,
        );
        assert!(matches!(result, Err(Error::InvalidDirectory { .. })));
    }

    #[test]
    fn test_empty_match_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let files = select(temp_dir.path(), "*.nc", TimeWindow::Today).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_selects_and_sorts_todays_files() {
        let temp_dir = TempDir::new().unwrap();
        let names = [
            "cmscl6001_20250429_110000.nc",
            "cmscl6001_20250429_090000.nc",
            "cmscl6001_20250429_100000.nc",
            "cmscl6001_20250428_090000.nc", // yesterday, excluded
            "cmscl6001_20250429_090000.txt", // wrong extension
        ];
        for name in names {
            File::create(temp_dir.path().join(name)).unwrap();
        }

        let files =
            select_at(temp_dir.path(), "*.nc", TimeWindow::Today, noon(2025, 4, 29)).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "cmscl6001_20250429_090000.nc",
                "cmscl6001_20250429_100000.nc",
                "cmscl6001_20250429_110000.nc",
            ]
        );
    }

    #[test]
    fn test_selects_last_hour_files() {
        let temp_dir = TempDir::new().unwrap();
        for name in [
            "cmscl6001_20250429_114500.nc",
            "cmscl6001_20250429_120500.nc",
        ] {
            File::create(temp_dir.path().join(name)).unwrap();
        }

        let files = select_at(
            temp_dir.path(),
            "*.nc",
            TimeWindow::LastHour,
            noon(2025, 4, 29),
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().contains("20250429_1145"));
    }
}

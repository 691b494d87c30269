//! Application constants for the CL61 processor
//!
//! This module contains configuration defaults, variable names, and plotting
//! constants used throughout the application.

// =============================================================================
// File Selection Defaults
// =============================================================================

/// Default directory searched for CL61 measurement files
pub const DEFAULT_DIR_PATH: &str = "/cl61/";

/// Default filename pattern appended to the window token
pub const DEFAULT_FILE_PATTERN: &str = "*.nc";

// =============================================================================
// Dataset Variable Names (CL61 instrument NetCDF)
// =============================================================================

/// Attenuated volume backscatter coefficient
pub const VAR_BETA_ATT: &str = "beta_att";

/// Linear depolarization ratio
pub const VAR_LINEAR_DEPOL: &str = "linear_depol_ratio";

/// Cloud layer base heights reported by the instrument sky condition algorithm
pub const VAR_CLOUD_HEIGHTS: &str = "sky_condition_cloud_layer_heights";

/// Time coordinate name
pub const VAR_TIME: &str = "time";

/// Range (height) coordinate name, metres above the instrument
pub const VAR_RANGE: &str = "range";

// =============================================================================
// Assembly Constants
// =============================================================================

/// Floor substituted for non-positive backscatter values before log10.
/// Keeps the transform defined over the instrument's noise floor.
pub const BETA_ATT_FLOOR: f64 = 1e-7;

/// Unit-attribute prefix marking an already log-scaled variable
pub const LOG_UNIT_PREFIX: &str = "log(";

// =============================================================================
// Plotting Constants
// =============================================================================

/// Hard wall-clock deadline for plot rendering, in seconds
pub const RENDER_TIMEOUT_SECS: u64 = 300;

/// Default square figure size in inches
pub const DEFAULT_PLOT_SIZE: u32 = 8;

/// Default upper height limit of both panels, in km
pub const DEFAULT_PLOT_HEIGHT_KM: f64 = 8.0;

/// Pixels per inch when rasterizing the figure
pub const PLOT_DPI: u32 = 100;

/// Robust color scaling percentiles (matplotlib `robust=True` convention)
pub const ROBUST_PERCENTILE_LOW: f64 = 2.0;
pub const ROBUST_PERCENTILE_HIGH: f64 = 98.0;

/// Fixed color range for the depolarization ratio panel
pub const DEPOL_VMIN: f64 = 0.0;
pub const DEPOL_VMAX: f64 = 0.7;

//! CL61 Processor Library
//!
//! A Rust library for consolidating Vaisala CL61 ceilometer NetCDF output and
//! producing quicklook plots for upload to a host messaging service.
//!
//! This library provides tools for:
//! - Selecting recently written measurement files by timestamped filename
//! - Merging per-file datasets into one time-sorted dataset
//! - Log-scaling attenuated backscatter for visualization
//! - Writing a consolidated NetCDF artifact with CF time encoding
//! - Rendering backscatter/depolarization heat maps with cloud-layer overlays
//! - Handing completed artifacts to a host publisher for upload

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod artifact_writer;
        pub mod dataset_assembler;
        pub mod file_selector;
        pub mod plot_renderer;
        pub mod publisher;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{Dataset, TimeWindow};
pub use config::Config;

/// Result type alias for the CL61 processor
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for CL61 processing operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Search path is missing or not a directory
    #[error("Invalid directory: {path}")]
    InvalidDirectory { path: String },

    /// Time window name outside today/yesterday/last_hour
    #[error("Unsupported time window: {window}")]
    UnsupportedWindow { window: String },

    /// Opening or combining the selected NetCDF files failed
    #[error("Dataset assembly error in '{file}': {message}")]
    Assembly {
        file: String,
        message: String,
        #[source]
        source: Option<netcdf::Error>,
    },

    /// Writing the consolidated NetCDF artifact failed
    #[error("Artifact writing error: {message}")]
    ArtifactWriting {
        message: String,
        #[source]
        source: Option<netcdf::Error>,
    },

    /// Plot rendering exceeded its wall-clock deadline
    #[error("Plot rendering timed out after {seconds}s")]
    RenderTimeout { seconds: u64 },

    /// Plot rendering failed
    #[error("Plot rendering error: {message}")]
    Rendering { message: String },

    /// Publishing an event or uploading a file failed
    #[error("Publish error: {message}")]
    Publish {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Date/time parsing error
    #[error("Date/time parsing error: {message}")]
    DateTimeParsing {
        message: String,
        #[source]
        source: Option<chrono::ParseError>,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create an invalid directory error
    pub fn invalid_directory(path: impl Into<String>) -> Self {
        Self::InvalidDirectory { path: path.into() }
    }

    /// Create an unsupported window error
    pub fn unsupported_window(window: impl Into<String>) -> Self {
        Self::UnsupportedWindow {
            window: window.into(),
        }
    }

    /// Create an assembly error with context
    pub fn assembly(
        file: impl Into<String>,
        message: impl Into<String>,
        source: Option<netcdf::Error>,
    ) -> Self {
        Self::Assembly {
            file: file.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an artifact writing error
    pub fn artifact_writing(message: impl Into<String>, source: Option<netcdf::Error>) -> Self {
        Self::ArtifactWriting {
            message: message.into(),
            source,
        }
    }

    /// Create a render timeout error
    pub fn render_timeout(seconds: u64) -> Self {
        Self::RenderTimeout { seconds }
    }

    /// Create a rendering error
    pub fn rendering(message: impl Into<String>) -> Self {
        Self::Rendering {
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(message: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Self::Publish {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a date/time parsing error
    pub fn datetime_parsing(message: impl Into<String>) -> Self {
        Self::DateTimeParsing {
            message: message.into(),
            source: None,
        }
    }

    /// Exit code for the process per the scheduler contract:
    /// 1 for an invalid search directory, 2 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidDirectory { .. } => 1,
            _ => 2,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<netcdf::Error> for Error {
    fn from(error: netcdf::Error) -> Self {
        Self::Assembly {
            file: "unknown".to_string(),
            message: "NetCDF operation failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(error: chrono::ParseError) -> Self {
        Self::DateTimeParsing {
            message: "Date/time parsing failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<glob::PatternError> for Error {
    fn from(error: glob::PatternError) -> Self {
        Self::Configuration {
            message: format!("Invalid glob pattern: {}", error),
        }
    }
}

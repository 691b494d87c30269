//! Command implementations for the CL61 processor CLI
//!
//! The binary exposes a single pipeline command; this module wires the
//! parsed arguments into it and re-exports the run statistics type.

pub mod process;
pub mod shared;

pub use shared::PipelineStats;

use crate::Result;
use crate::cli::args::Args;

/// Main command runner for the CL61 processor
pub async fn run(args: Args) -> Result<PipelineStats> {
    process::run_process(args).await
}

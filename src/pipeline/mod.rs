//! Batch pipeline: extract, transform, load
//!
//! This module orchestrates the three stages:
//! - Extract bookings from a delimited file and users from an API or file
//! - Transform them into dimension and fact tables
//! - Load every table to delimited files and, optionally, DuckDB
//!
//! # Example
//!
//! ```rust,ignore
//! use booking_etl::pipeline::{PipelineConfig, PipelineExecutor};
//!
//! let config = PipelineConfig::new()
//!     .with_bookings("data/hotel_bookings.csv")
//!     .with_users_url("https://jsonplaceholder.typicode.com/users")
//!     .with_output_dir("data/transform")
//!     .with_seed(42);
//!
//! let mut executor = PipelineExecutor::new(config)?;
//! let report = executor.run()?;
//!
//! println!("Pipeline completed in {}", report.duration_formatted());
//! ```
//!
//! # Dry Run
//!
//! Validate inputs without executing:
//!
//! ```rust,ignore
//! let config = PipelineConfig::from_file("pipeline.toml")?.with_dry_run(true);
//! let report = run_pipeline(config)?;
//! ```
//!
//! Components are injected through [`PipelineExecutor::with_components`],
//! so any [`Extractor`](crate::extract::Extractor),
//! [`Transformer`](crate::transform::Transformer) or
//! [`Loader`](crate::load::Loader) can stand in for the defaults.

mod config;
mod error;
mod executor;
mod report;

pub use config::{PipelineConfig, PipelineStage};
pub use error::{PipelineError, PipelineResult};
pub use executor::PipelineExecutor;
pub use report::{PipelineReport, PipelineStatus, StageOutput};

/// Run a pipeline with the given configuration
///
/// This is a convenience function for simple pipeline execution.
pub fn run_pipeline(config: PipelineConfig) -> PipelineResult<PipelineReport> {
    let mut executor = PipelineExecutor::new(config)?;
    executor.run()
}

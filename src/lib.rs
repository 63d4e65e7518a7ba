//! # churnflow - customer churn ETL toolkit
//!
//! churnflow pulls telecom customer records from a mock generator, CSV, Excel,
//! JSON or an HTTP endpoint, cleans them and derives churn features,
//! checks data quality, and writes the result in several formats together
//! with a JSON record of the run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use churnflow::config::PipelineConfig;
//! use churnflow::etl::{Pipeline, SourceDescriptor};
//!
//! # fn example() -> churnflow::error::Result<()> {
//! let mut pipeline = Pipeline::new(PipelineConfig::default());
//! let summary = pipeline.run(&SourceDescriptor::Mock { records: 1000 })?;
//! println!("{} records loaded", summary.records_loaded.unwrap_or(0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`etl`]: the extract, transform, validate and load stages and the
//!   [`etl::Pipeline`] that sequences them
//! - [`analysis`]: descriptive statistics, churn rates and k-means segments
//! - [`api`]: clients for third-party data providers with a response cache
//! - [`io`]: reading and writing datasets by file extension
//! - [`config`]: JSON run configuration
//! - [`error`]: error types and handling utilities
//! - [`logging`]: console and rolling-file logging
//!
//! ## Run lifecycle
//!
//! ```text
//! NotStarted -> Extracting -> Transforming -> Validating -> Loading -> Completed
//!                                         \________________/
//!                                          skip_validation
//! any non-terminal state -> Failed
//! ```
//!
//! Validation findings never stop a run; they are reported in the run summary.
//! Any other phase error moves the run to `Failed`, and the summary is still
//! written to `<output_dir>/<base_filename>_pipeline_log.json`.

#![warn(clippy::all, rust_2018_idioms)]

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod etl;
pub mod io;
pub mod logging;

//! The extract, transform, validate and load stages.
//!
//! Stages run strictly in sequence and hand whole datasets (Polars
//! `DataFrame`s) to one another. [`pipeline::Pipeline`] sequences them and
//! records the outcome of each phase.
//!
//! ```no_run
//! use churnflow::config::PipelineConfig;
//! use churnflow::etl::{Pipeline, SourceDescriptor};
//!
//! let mut pipeline = Pipeline::new(PipelineConfig::default());
//! let summary = pipeline.run(&SourceDescriptor::Mock { records: 1000 })?;
//! assert!(summary.success);
//! # Ok::<(), churnflow::error::ChurnError>(())
//! ```

pub mod execution_log;
pub mod extractor;
pub mod frame;
pub mod loader;
pub mod mock;
pub mod pipeline;
pub mod transformer;
pub mod validator;

pub use execution_log::{ExecutionLog, ExecutionSummary, StepRecord, StepStatus};
pub use extractor::{ApiSource, Extractor, SourceDescriptor};
pub use frame::{DatasetInfo, dataset_info};
pub use loader::{DataLoader, DatasetMetadata, OutputFormat};
pub use pipeline::{Pipeline, PipelineSummary, RunState};
pub use transformer::{
    EncodingMethod, FillValue, MissingStrategy, ScalingMethod, TargetType, TransformConfig,
    Transformer,
};
pub use validator::{
    CategoricalRule, ExpectedType, RangeRule, Severity, ValidationConfig, ValidationReport,
    Validator,
};

//! Extract, transform, validate and load as one unit of work.
//!
//! A run moves through [`RunState`]s in a fixed order. Any failing phase
//! moves the run to `Failed` and skips the remaining phases, but the JSON run
//! summary is written either way.

use crate::api::transport::HttpTransport;
use crate::config::PipelineConfig;
use crate::error::{ChurnError, Result};
use crate::etl::execution_log::{ExecutionLog, ExecutionSummary, StepRecord};
use crate::etl::extractor::{Extractor, SourceDescriptor};
use crate::etl::loader::DataLoader;
use crate::etl::transformer::Transformer;
use crate::etl::validator::{ValidationReport, Validator};
use chrono::{DateTime, Local};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunState {
    #[default]
    NotStarted,
    Extracting,
    Transforming,
    Validating,
    Loading,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Execution-log step name for work done in this state.
    pub fn step_name(self) -> &'static str {
        match self {
            Self::NotStarted => "start",
            Self::Extracting => "extract",
            Self::Transforming => "transform",
            Self::Validating => "validate",
            Self::Loading => "load",
            Self::Completed => "complete",
            Self::Failed => "failed",
        }
    }

    /// `Transforming -> Loading` is the skip-validation path.
    pub fn can_transition_to(self, next: Self) -> bool {
        use RunState::{Completed, Extracting, Failed, Loading, NotStarted, Transforming, Validating};
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (NotStarted, Extracting)
            | (Extracting, Transforming)
            | (Transforming, Validating | Loading)
            | (Validating, Loading)
            | (Loading, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The JSON document written as `<base>_pipeline_log.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
    pub final_state: RunState,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_seconds: f64,
    pub records_extracted: Option<usize>,
    pub records_loaded: Option<usize>,
    pub columns_original: Option<usize>,
    pub columns_final: Option<usize>,
    pub validation_results: Option<ValidationReport>,
    pub output_files: BTreeMap<String, PathBuf>,
    pub transformation_log: Vec<String>,
    pub execution_log: Vec<StepRecord>,
    pub steps: ExecutionSummary,
}

/// Values gathered while phases run, kept even when a later phase fails.
#[derive(Debug, Default)]
struct RunProgress {
    records_extracted: Option<usize>,
    records_loaded: Option<usize>,
    columns_original: Option<usize>,
    columns_final: Option<usize>,
    validation: Option<ValidationReport>,
    output_files: BTreeMap<String, PathBuf>,
    transformation_log: Vec<String>,
}

pub struct Pipeline {
    config: PipelineConfig,
    state: RunState,
    log: ExecutionLog,
    transport: Option<Arc<dyn HttpTransport>>,
    raw: Option<DataFrame>,
    processed: Option<DataFrame>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: RunState::NotStarted,
            log: ExecutionLog::new(),
            transport: None,
            raw: None,
            processed: None,
        }
    }

    /// HTTP transport handed to the extractor for API sources.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn execution_log(&self) -> &ExecutionLog {
        &self.log
    }

    /// Step counts of the current or last run.
    pub fn execution_summary(&self) -> ExecutionSummary {
        self.log.summary()
    }

    /// Dataset as extracted by the last run.
    pub fn raw_data(&self) -> Option<&DataFrame> {
        self.raw.as_ref()
    }

    /// Dataset after transformation in the last run.
    pub fn processed_data(&self) -> Option<&DataFrame> {
        self.processed.as_ref()
    }

    pub fn summary_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}_pipeline_log.json", self.config.base_filename))
    }

    fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ChurnError::Other(format!(
                "Invalid state transition {} -> {next}",
                self.state
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Runs every phase and writes the run summary.
    ///
    /// A failing phase does not make this return `Err`: the failure is
    /// recorded in the returned summary. `Err` means the summary itself could
    /// not be written.
    pub fn run(&mut self, source: &SourceDescriptor) -> Result<PipelineSummary> {
        self.state = RunState::NotStarted;
        self.log = ExecutionLog::new();
        self.raw = None;
        self.processed = None;

        let run_id = Uuid::new_v4();
        let start_time = Local::now();
        info!("Starting ETL run {run_id} from {source}");

        let mut progress = RunProgress::default();
        let outcome = self.execute(source, &mut progress);

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                let message = e.to_string();
                self.log.error(self.state.step_name(), message.clone());
                self.state = RunState::Failed;
                error!("ETL run {run_id} failed: {message}");
                Some(message)
            }
        };

        let end_time = Local::now();
        let duration_seconds = (end_time - start_time).num_milliseconds() as f64 / 1000.0;
        let summary = PipelineSummary {
            run_id,
            success: error.is_none(),
            error,
            final_state: self.state,
            start_time,
            end_time,
            duration_seconds,
            records_extracted: progress.records_extracted,
            records_loaded: progress.records_loaded,
            columns_original: progress.columns_original,
            columns_final: progress.columns_final,
            validation_results: progress.validation,
            output_files: progress.output_files,
            transformation_log: progress.transformation_log,
            execution_log: self.log.records().to_vec(),
            steps: self.log.summary(),
        };

        let path = self.summary_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        info!(
            "ETL run {run_id} finished as {} in {duration_seconds:.2}s, summary at {}",
            summary.final_state,
            path.display()
        );
        Ok(summary)
    }

    fn execute(&mut self, source: &SourceDescriptor, progress: &mut RunProgress) -> Result<()> {
        self.transition(RunState::Extracting)?;
        let mut extractor = Extractor::new(self.config.extract.clone());
        if let Some(transport) = &self.transport {
            extractor = extractor.with_transport(Arc::clone(transport));
        }
        let raw = extractor.extract(source)?;
        progress.records_extracted = Some(raw.height());
        progress.columns_original = Some(raw.width());
        self.log.success(
            "extract",
            format!("Extracted {} records from {source}", raw.height()),
        );

        self.transition(RunState::Transforming)?;
        let mut transformer = Transformer::new(self.config.transform.clone());
        let transformed = transformer.apply_all(&raw);
        progress.transformation_log = transformer.transformation_log().to_vec();
        self.raw = Some(raw);
        let transformed = transformed?;
        progress.columns_final = Some(transformed.width());
        self.log.success(
            "transform",
            format!(
                "Transformed into {} records x {} columns",
                transformed.height(),
                transformed.width()
            ),
        );

        if self.config.skip_validation {
            self.log.warning("validate", "Validation skipped");
        } else {
            self.transition(RunState::Validating)?;
            let mut validator = Validator::new(self.config.validation.clone());
            let report = validator.run_full_validation(&transformed)?;
            if report.is_valid() {
                self.log.success(
                    "validate",
                    format!("Validation passed with {} warnings", report.warnings.len()),
                );
            } else {
                self.log.warning(
                    "validate",
                    format!(
                        "Validation found {} errors and {} warnings",
                        report.errors.len(),
                        report.warnings.len()
                    ),
                );
            }
            progress.validation = Some(report);
        }

        self.transition(RunState::Loading)?;
        let mut loader = DataLoader::new(&self.config.output_dir)?;
        let files = loader.save_all_formats(
            &transformed,
            &self.config.base_filename,
            &self.config.output_formats,
        )?;
        progress.records_loaded = Some(transformed.height());
        progress.output_files = files;
        self.log.success(
            "load",
            format!(
                "Saved {} files to {}",
                progress.output_files.len(),
                loader.output_dir().display()
            ),
        );
        self.processed = Some(transformed);

        self.transition(RunState::Completed)
    }
}

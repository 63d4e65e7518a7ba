use crate::api::transport::TransportError;
use crate::api::transport::fake::FakeTransport;
use crate::config::PipelineConfig;
use crate::etl::execution_log::StepStatus;
use crate::etl::extractor::{ApiSource, SourceDescriptor};
use crate::etl::loader::OutputFormat;
use crate::etl::pipeline::{Pipeline, PipelineSummary, RunState};
use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const API_URL: &str = "https://crm.example.test/export";

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.to_path_buf(),
        base_filename: "run".to_owned(),
        output_formats: vec![OutputFormat::Csv],
        ..PipelineConfig::default()
    }
}

#[test]
fn test_skip_validation_goes_straight_to_loading() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = Pipeline::new(PipelineConfig {
        skip_validation: true,
        ..config(dir.path())
    });

    let summary = pipeline.run(&SourceDescriptor::Mock { records: 50 })?;
    assert!(summary.success);
    assert_eq!(summary.final_state, RunState::Completed);
    assert!(summary.validation_results.is_none());
    assert_eq!(summary.steps.warning_steps, 1);
    assert!(
        summary
            .execution_log
            .iter()
            .any(|r| r.step == "validate" && r.status == StepStatus::Warning)
    );
    Ok(())
}

#[test]
fn test_api_source_through_injected_transport() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let records = json!([
        {"CustomerID": "A1", "tenure": 5, "MonthlyCharges": 30.0, "TotalCharges": 150.0, "Churn": "No"},
        {"CustomerID": "A2", "tenure": 50, "MonthlyCharges": 90.0, "TotalCharges": 4500.0, "Churn": "Yes"}
    ]);
    let fake = Arc::new(FakeTransport::new().respond(API_URL, Ok(records)));
    let mut pipeline = Pipeline::new(config(dir.path())).with_transport(fake);

    let source = SourceDescriptor::Api(ApiSource {
        url: API_URL.to_owned(),
        ..ApiSource::default()
    });
    let summary = pipeline.run(&source)?;

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.records_extracted, Some(2));
    assert_eq!(summary.records_loaded, Some(2));
    assert_eq!(pipeline.raw_data().map(|df| df.width()), Some(5));
    assert!(pipeline.processed_data().is_some());
    Ok(())
}

#[test]
fn test_failed_extraction_still_writes_summary() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fake = Arc::new(FakeTransport::new().respond(API_URL, Err(TransportError::Status(500))));
    let mut pipeline = Pipeline::new(config(dir.path())).with_transport(fake);

    let source = SourceDescriptor::Api(ApiSource {
        url: API_URL.to_owned(),
        ..ApiSource::default()
    });
    let summary = pipeline.run(&source)?;

    assert!(!summary.success);
    assert_eq!(summary.final_state, RunState::Failed);
    assert_eq!(pipeline.state(), RunState::Failed);
    assert!(summary.error.as_deref().is_some_and(|e| e.contains("500")));
    assert_eq!(summary.records_extracted, None);
    assert_eq!(summary.steps.failed_steps, 1);
    assert_eq!(summary.execution_log[0].step, "extract");

    let written: PipelineSummary =
        serde_json::from_str(&std::fs::read_to_string(pipeline.summary_path())?)?;
    assert_eq!(written.run_id, summary.run_id);
    assert!(!written.success);
    Ok(())
}

#[test]
fn test_each_run_starts_fresh() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = Pipeline::new(config(dir.path()));

    let first = pipeline.run(&SourceDescriptor::Mock { records: 20 })?;
    let second = pipeline.run(&SourceDescriptor::Mock { records: 20 })?;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.steps.total_steps, second.steps.total_steps);
    assert_eq!(pipeline.execution_log().records().len(), second.steps.total_steps);
    assert_eq!(pipeline.execution_summary(), second.steps);
    Ok(())
}

#[test]
fn test_transform_failure_keeps_earlier_entries() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path());
    config.transform.encode_columns = vec!["Absent".to_owned()];
    let mut pipeline = Pipeline::new(config);

    let summary = pipeline.run(&SourceDescriptor::Mock { records: 30 })?;

    assert!(!summary.success);
    assert_eq!(summary.final_state, RunState::Failed);
    assert_eq!(summary.records_extracted, Some(30));
    assert_eq!(summary.records_loaded, None);
    assert!(summary.validation_results.is_none());
    assert!(summary.output_files.is_empty());
    assert!(
        summary.error.as_deref().is_some_and(|e| e.contains("Absent")),
        "{:?}",
        summary.error
    );

    let steps: Vec<(&str, StepStatus)> = summary
        .execution_log
        .iter()
        .map(|r| (r.step.as_str(), r.status))
        .collect();
    assert_eq!(
        steps,
        [("extract", StepStatus::Success), ("transform", StepStatus::Error)]
    );

    // steps before encoding ran and were logged, the timestamp never was
    assert!(!summary.transformation_log.is_empty());
    assert!(summary.transformation_log.iter().any(|l| l == "CLV calculated"));
    assert!(
        !summary
            .transformation_log
            .iter()
            .any(|l| l == "Processing timestamp added")
    );

    assert!(pipeline.processed_data().is_none());
    assert!(!dir.path().join("run.csv").exists());
    let written: PipelineSummary =
        serde_json::from_str(&std::fs::read_to_string(pipeline.summary_path())?)?;
    assert_eq!(written.final_state, RunState::Failed);
    assert_eq!(written.execution_log.len(), 2);
    Ok(())
}

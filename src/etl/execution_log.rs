//! Per-run record of pipeline step outcomes.
//!
//! Entries are kept in memory for the run summary and mirrored to `tracing`
//! at the level matching their status.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub timestamp: DateTime<Local>,
    pub step: String,
    pub status: StepStatus,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExecutionSummary {
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub warning_steps: usize,
}

/// Append-only list of [`StepRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    records: Vec<StepRecord>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: &str, status: StepStatus, details: impl Into<String>) {
        let details = details.into();
        match status {
            StepStatus::Success => info!(step, "{details}"),
            StepStatus::Warning => warn!(step, "{details}"),
            StepStatus::Error => error!(step, "{details}"),
        }
        self.records.push(StepRecord {
            timestamp: Local::now(),
            step: step.to_owned(),
            status,
            details,
        });
    }

    pub fn success(&mut self, step: &str, details: impl Into<String>) {
        self.record(step, StepStatus::Success, details);
    }

    pub fn warning(&mut self, step: &str, details: impl Into<String>) {
        self.record(step, StepStatus::Warning, details);
    }

    pub fn error(&mut self, step: &str, details: impl Into<String>) {
        self.record(step, StepStatus::Error, details);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> ExecutionSummary {
        let count = |status| self.records.iter().filter(|r| r.status == status).count();
        ExecutionSummary {
            total_steps: self.records.len(),
            successful_steps: count(StepStatus::Success),
            failed_steps: count(StepStatus::Error),
            warning_steps: count(StepStatus::Warning),
        }
    }
}

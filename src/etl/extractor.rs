//! Extraction of raw customer records from mock, file and HTTP sources.

use crate::api::transport::{HttpTransport, Params, ReqwestTransport};
use crate::config::ExtractConfig;
use crate::error::{ChurnError, Result};
use crate::etl::mock;
use crate::io::{self, SheetSelector};
use polars::prelude::*;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// An HTTP endpoint returning customer records as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSource {
    pub url: String,
    pub params: Params,
    pub headers: Params,
    /// Member holding the record array when the payload is an object.
    pub records_key: Option<String>,
}

/// Where a run's raw dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Mock { records: usize },
    Csv { path: PathBuf },
    Excel { path: PathBuf, sheet: SheetSelector },
    Json { path: PathBuf },
    Api(ApiSource),
}

impl SourceDescriptor {
    /// Picks the file source matching `path`'s extension.
    pub fn from_path(path: impl Into<PathBuf>, sheet: SheetSelector) -> Result<Self> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv { path }),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(Self::Excel { path, sheet }),
            "json" => Ok(Self::Json { path }),
            other => Err(ChurnError::Config(format!(
                "Cannot infer source type from extension '{other}' ({})",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock { records } => write!(f, "mock ({records} records)"),
            Self::Csv { path } => write!(f, "csv {}", path.display()),
            Self::Excel { path, .. } => write!(f, "excel {}", path.display()),
            Self::Json { path } => write!(f, "json {}", path.display()),
            Self::Api(api) => write!(f, "api {}", api.url),
        }
    }
}

pub struct Extractor {
    config: ExtractConfig,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl Extractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Use `transport` for API sources instead of a real HTTP client.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn extract(&self, source: &SourceDescriptor) -> Result<DataFrame> {
        let df = match source {
            SourceDescriptor::Mock { records } => self.generate_mock_data(*records)?,
            SourceDescriptor::Csv { path } => Self::extract_file(path, io::read_csv)?,
            SourceDescriptor::Excel { path, sheet } => {
                Self::extract_file(path, |p| io::read_excel(p, sheet))?
            }
            SourceDescriptor::Json { path } => Self::extract_file(path, io::read_json)?,
            SourceDescriptor::Api(api) => self.extract_from_api(api)?,
        };
        info!("Extracted {} records from {source}", df.height());
        Ok(df)
    }

    pub fn generate_mock_data(&self, records: usize) -> Result<DataFrame> {
        let df = mock::generate(records, self.config.seed)?;
        if let Ok(rate) = crate::analysis::churn::churn_rate(&df, "Churn") {
            info!("Mock churn rate: {:.2}%", rate * 100.0);
        }
        Ok(df)
    }

    fn extract_file(path: &Path, read: impl FnOnce(&Path) -> Result<DataFrame>) -> Result<DataFrame> {
        read(path).inspect_err(|e| error!("Extraction from {} failed: {e}", path.display()))
    }

    /// Issues one GET; any transport or payload problem is an extraction failure.
    pub fn extract_from_api(&self, api: &ApiSource) -> Result<DataFrame> {
        let transport: Arc<dyn HttpTransport> = match &self.transport {
            Some(t) => Arc::clone(t),
            None => Arc::new(ReqwestTransport::new(Duration::from_secs(
                self.config.api_timeout_secs,
            ))?),
        };

        let payload = transport
            .get(&api.url, &api.params, &api.headers)
            .map_err(|e| ChurnError::Extraction(format!("{}: {e}", api.url)))?;

        let records = records_from_payload(payload, api.records_key.as_deref())?;
        io::json_records_to_df(&records)
            .map_err(|e| ChurnError::Extraction(format!("{}: {e}", api.url)))
    }
}

/// Locates the array of row objects inside an API payload.
pub fn records_from_payload(payload: Value, records_key: Option<&str>) -> Result<Value> {
    match (payload, records_key) {
        (records @ Value::Array(_), _) => Ok(records),
        (Value::Object(mut map), Some(key)) => match map.remove(key) {
            Some(records @ Value::Array(_)) => Ok(records),
            Some(_) => Err(ChurnError::Extraction(format!(
                "Payload member '{key}' is not an array"
            ))),
            None => Err(ChurnError::Extraction(format!(
                "Payload has no member '{key}'"
            ))),
        },
        (Value::Object(_), None) => Err(ChurnError::Extraction(
            "Payload is an object; a records key is required".to_owned(),
        )),
        _ => Err(ChurnError::Extraction(
            "Payload is not a JSON array of records".to_owned(),
        )),
    }
}

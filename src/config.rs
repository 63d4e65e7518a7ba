//! Run configuration.
//!
//! A pipeline run is driven by a [`PipelineConfig`], normally loaded from a
//! JSON file and then overridden by command-line flags. Every field has a
//! default so partial files are accepted.

use crate::error::{ChurnError, Result, ResultExt as _};
use crate::etl::loader::OutputFormat;
use crate::etl::transformer::TransformConfig;
use crate::etl::validator::ValidationConfig;
use crate::io::SheetSelector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.json";
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_BASE_FILENAME: &str = "telecom_churn_processed";

/// Seed used by the mock generator unless overridden.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Rows produced by the mock source
    pub mock_records: usize,
    /// Seed for the mock source
    pub seed: u64,
    /// Worksheet read from Excel sources
    pub excel_sheet: SheetSelector,
    /// Timeout for API extraction, in seconds
    pub api_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            mock_records: 1000,
            seed: DEFAULT_SEED,
            excel_sheet: SheetSelector::default(),
            api_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub base_filename: String,
    pub output_formats: Vec<OutputFormat>,
    pub log_dir: PathBuf,
    pub skip_validation: bool,
    pub extract: ExtractConfig,
    pub transform: TransformConfig,
    pub validation: ValidationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            base_filename: DEFAULT_BASE_FILENAME.to_owned(),
            output_formats: vec![OutputFormat::Csv, OutputFormat::Excel, OutputFormat::Parquet],
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            skip_validation: false,
            extract: ExtractConfig::default(),
            transform: TransformConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ChurnError::Config(format!("Invalid config: {e}")))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save the configuration as pretty JSON, creating parent directories.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

//! Persisting processed datasets and their metadata.

use crate::analysis::statistics::{NumericSummary, describe_numeric};
use crate::error::Result;
use crate::etl::frame::{duplicate_count, memory_usage_mb, null_count};
use crate::io;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXCEL_SHEET_NAME: &str = "Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    Excel,
    Parquet,
    /// Array of row objects
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Description of a saved dataset, written as `<base>_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub processed_at: String,
    pub total_records: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, String>,
    pub memory_usage_mb: f64,
    pub null_values: usize,
    pub duplicates: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub numeric_summary: BTreeMap<String, NumericSummary>,
}

impl DatasetMetadata {
    pub fn from_df(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            processed_at: chrono::Local::now().to_rfc3339(),
            total_records: df.height(),
            total_columns: df.width(),
            columns: df.get_column_names().iter().map(|s| s.to_string()).collect(),
            dtypes: df
                .get_columns()
                .iter()
                .map(|c| (c.name().to_string(), c.dtype().to_string()))
                .collect(),
            memory_usage_mb: memory_usage_mb(df),
            null_values: null_count(df),
            duplicates: duplicate_count(df, None)?,
            numeric_summary: describe_numeric(df)?,
        })
    }
}

/// Writes files into one output directory and remembers what it wrote.
#[derive(Debug)]
pub struct DataLoader {
    output_dir: PathBuf,
    loaded_files: Vec<PathBuf>,
}

impl DataLoader {
    /// Creates `output_dir` if it does not exist.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            loaded_files: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    fn track(&mut self, path: PathBuf) -> PathBuf {
        info!("Saved {}", path.display());
        self.loaded_files.push(path.clone());
        path
    }

    pub fn save(&mut self, df: &DataFrame, filename: &str, format: OutputFormat) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let mut df = df.clone();
        match format {
            OutputFormat::Csv => io::write_csv(&mut df, &path)?,
            OutputFormat::Excel => io::write_excel(&df, &path, EXCEL_SHEET_NAME)?,
            OutputFormat::Parquet => io::write_parquet(&mut df, &path)?,
            OutputFormat::Json => io::write_json(&mut df, &path)?,
        }
        Ok(self.track(path))
    }

    /// Writes any serializable value as pretty JSON.
    pub fn save_json<T: Serialize>(&mut self, value: &T, filename: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        Ok(self.track(path))
    }

    pub fn save_metadata(&mut self, df: &DataFrame, filename: &str) -> Result<PathBuf> {
        let metadata = DatasetMetadata::from_df(df)?;
        self.save_json(&metadata, filename)
    }

    /// Saves `df` as `<base>.<ext>` for each format plus `<base>_metadata.json`.
    ///
    /// The returned map is keyed by format name, and `metadata`.
    pub fn save_all_formats(
        &mut self,
        df: &DataFrame,
        base_filename: &str,
        formats: &[OutputFormat],
    ) -> Result<BTreeMap<String, PathBuf>> {
        let mut paths = BTreeMap::new();
        for format in formats {
            let filename = format!("{base_filename}.{}", format.extension());
            let path = self.save(df, &filename, *format)?;
            paths.insert(format.key().to_owned(), path);
        }
        let metadata = self.save_metadata(df, &format!("{base_filename}_metadata.json"))?;
        paths.insert("metadata".to_owned(), metadata);
        Ok(paths)
    }
}

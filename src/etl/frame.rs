//! Row- and column-level helpers shared by the ETL stages.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Fails with [`ChurnError::MissingColumn`] if `name` is not in `df`.
pub fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        Ok(())
    } else {
        Err(ChurnError::MissingColumn(name.to_owned()))
    }
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Names of all columns with a numeric dtype, in frame order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Total number of null cells.
pub fn null_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

/// Keeps the first of each group of rows identical over `subset` (all
/// columns when `None`), preserving row order.
pub fn unique_rows(df: &DataFrame, subset: Option<&[String]>) -> Result<DataFrame> {
    if let Some(names) = subset {
        for name in names {
            require_column(df, name)?;
        }
    }
    Ok(df.unique_stable(subset, UniqueKeepStrategy::First, None)?)
}

/// Rows that repeat an earlier row over `subset`.
pub fn duplicate_count(df: &DataFrame, subset: Option<&[String]>) -> Result<usize> {
    Ok(df.height() - unique_rows(df, subset)?.height())
}

/// Summary of a dataset's shape and quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub memory_usage_mb: f64,
    pub null_values: usize,
    pub duplicates: usize,
}

pub fn dataset_info(df: &DataFrame) -> Result<DatasetInfo> {
    Ok(DatasetInfo {
        rows: df.height(),
        columns: df.width(),
        column_names: df.get_column_names().iter().map(|s| s.to_string()).collect(),
        memory_usage_mb: memory_usage_mb(df),
        null_values: null_count(df),
        duplicates: duplicate_count(df, None)?,
    })
}

pub fn memory_usage_mb(df: &DataFrame) -> f64 {
    let mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

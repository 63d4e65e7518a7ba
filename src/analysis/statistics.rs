//! Descriptive statistics for numeric columns.

use crate::error::Result;
use crate::etl::frame::numeric_columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count, mean, sample standard deviation and the five-number summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

pub fn summarize(column: &Column) -> Result<NumericSummary> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let ca = series.f64()?;

    Ok(NumericSummary {
        count: ca.len() - ca.null_count(),
        mean: ca.mean(),
        std: ca.std(1),
        min: ca.min(),
        q25: ca.quantile(0.25, QuantileMethod::Linear)?,
        median: ca.quantile(0.5, QuantileMethod::Linear)?,
        q75: ca.quantile(0.75, QuantileMethod::Linear)?,
        max: ca.max(),
    })
}

/// Summary of every numeric column, keyed by column name.
pub fn describe_numeric(df: &DataFrame) -> Result<BTreeMap<String, NumericSummary>> {
    numeric_columns(df)
        .into_iter()
        .map(|name| {
            let summary = summarize(df.column(&name)?)?;
            Ok((name, summary))
        })
        .collect()
}

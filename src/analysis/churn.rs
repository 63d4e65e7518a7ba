//! Churn rates overall and per segment.

use crate::error::{ChurnError, Result};
use crate::etl::frame::require_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CHURN_POSITIVE: &str = "Yes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChurn {
    pub customers: usize,
    pub churned: usize,
    pub churn_rate: f64,
}

fn text_values(df: &DataFrame, column: &str) -> Result<StringChunked> {
    require_column(df, column)?;
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

/// Fraction of rows whose churn label is `"Yes"`.
pub fn churn_rate(df: &DataFrame, churn_column: &str) -> Result<f64> {
    let labels = text_values(df, churn_column)?;
    if labels.is_empty() {
        return Err(ChurnError::Analysis("Cannot compute churn rate of an empty dataset".to_owned()));
    }
    let churned = labels
        .into_iter()
        .filter(|v| *v == Some(CHURN_POSITIVE))
        .count();
    Ok(churned as f64 / labels.len() as f64)
}

/// Churn rate per distinct value of `segment_column`; null segments are skipped.
pub fn churn_by_segment(
    df: &DataFrame,
    segment_column: &str,
    churn_column: &str,
) -> Result<BTreeMap<String, SegmentChurn>> {
    require_column(df, segment_column)?;
    require_column(df, churn_column)?;

    let grouped = df
        .clone()
        .lazy()
        .select([
            col(segment_column).cast(DataType::String).alias("segment"),
            col(churn_column)
                .cast(DataType::String)
                .eq(lit(CHURN_POSITIVE))
                .fill_null(lit(false))
                .alias("churned"),
        ])
        .filter(col("segment").is_not_null())
        .group_by([col("segment")])
        .agg([
            len().cast(DataType::UInt64).alias("customers"),
            col("churned").sum().cast(DataType::UInt64).alias("churned"),
        ])
        .collect()?;

    let segments = grouped.column("segment")?.as_materialized_series().str()?.clone();
    let customers = grouped.column("customers")?.as_materialized_series().u64()?.clone();
    let churned = grouped.column("churned")?.as_materialized_series().u64()?.clone();

    let mut out = BTreeMap::new();
    for ((segment, customers), churned) in segments
        .into_iter()
        .zip(customers.into_iter())
        .zip(churned.into_iter())
    {
        let (Some(segment), Some(customers)) = (segment, customers) else {
            continue;
        };
        let churned = churned.unwrap_or(0);
        out.insert(
            segment.to_owned(),
            SegmentChurn {
                customers: usize::try_from(customers)
                    .map_err(|e| ChurnError::Analysis(e.to_string()))?,
                churned: usize::try_from(churned)
                    .map_err(|e| ChurnError::Analysis(e.to_string()))?,
                churn_rate: churned as f64 / customers as f64,
            },
        );
    }
    Ok(out)
}

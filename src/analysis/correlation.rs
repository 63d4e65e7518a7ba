//! Pearson correlation between numeric columns.

use crate::error::{ChurnError, Result};
use crate::etl::frame::numeric_columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const HIGH_CORRELATION_THRESHOLD: f64 = 0.7;

/// Square matrix over `columns`; `None` where a coefficient is undefined
/// (a constant column, or fewer than two shared non-null rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

fn as_f64(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

/// Coefficient over the rows where both columns are non-null.
fn pairwise(a: &Float64Chunked, b: &Float64Chunked) -> Result<Option<f64>> {
    let both = &a.is_not_null() & &b.is_not_null();
    let (a, b) = (a.filter(&both)?, b.filter(&both)?);
    if a.len() < 2 {
        return Ok(None);
    }
    Ok(cov::pearson_corr(&a, &b).filter(|r| r.is_finite()))
}

/// Pairwise Pearson coefficients between every numeric column of `df`.
///
/// # Errors
///
/// Fails with [`ChurnError::Analysis`] when `df` has fewer than two numeric
/// columns.
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationMatrix> {
    let columns = numeric_columns(df);
    if columns.len() < 2 {
        return Err(ChurnError::Analysis(format!(
            "Correlation needs at least two numeric columns, found {}",
            columns.len()
        )));
    }

    let data = columns
        .iter()
        .map(|name| as_f64(df, name))
        .collect::<Result<Vec<_>>>()?;

    let mut values = Vec::with_capacity(data.len());
    for (i, a) in data.iter().enumerate() {
        let mut row = Vec::with_capacity(data.len());
        for (j, b) in data.iter().enumerate() {
            let r = if i == j {
                pairwise(a, a)?.map(|_| 1.0)
            } else {
                pairwise(a, b)?
            };
            row.push(r);
        }
        values.push(row);
    }

    Ok(CorrelationMatrix { columns, values })
}

impl CorrelationMatrix {
    pub fn get(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == first)?;
        let j = self.columns.iter().position(|c| c == second)?;
        self.values.get(i)?.get(j).copied().flatten()
    }

    /// Column pairs whose absolute coefficient exceeds `threshold`, each pair
    /// listed once in column order.
    pub fn high_correlations(&self, threshold: f64) -> Vec<CorrelationPair> {
        let mut pairs = Vec::new();
        for (i, (first, row)) in self.columns.iter().zip(&self.values).enumerate() {
            for (second, r) in self.columns.iter().zip(row).skip(i + 1) {
                if let Some(r) = *r
                    && r.abs() > threshold
                {
                    pairs.push(CorrelationPair {
                        first: first.clone(),
                        second: second.clone(),
                        coefficient: r,
                    });
                }
            }
        }
        pairs
    }
}

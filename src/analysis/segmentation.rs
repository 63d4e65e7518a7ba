//! K-means customer segmentation.
//!
//! Features are z-scored before clustering so that charges in the hundreds do
//! not drown out tenure or service counts. The random generator is seeded so
//! repeated runs over the same data produce the same segments.

use crate::error::{ChurnError, Result};
use crate::etl::frame::{has_column, require_column};
use linfa::Dataset;
use linfa::traits::{Fit as _, Predict as _};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEGMENT_COLUMN: &str = "Segment";
pub const SEGMENTATION_SEED: u64 = 42;

const MAX_ITERATIONS: u64 = 300;
const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: usize,
    pub customers: usize,
    /// Mean of each feature in original units
    pub feature_means: BTreeMap<String, f64>,
    /// Present when the frame has a `Churn` column
    pub churn_rate: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Input frame with a `Segment` column appended
    pub data: DataFrame,
    pub profiles: Vec<SegmentProfile>,
}

fn feature_matrix(df: &DataFrame, features: &[String]) -> Result<Array2<f64>> {
    let mut matrix = Array2::<f64>::zeros((df.height(), features.len()));
    for (j, name) in features.iter().enumerate() {
        require_column(df, name)?;
        let column = df.column(name)?;
        if !column.dtype().is_numeric() {
            return Err(ChurnError::Analysis(format!(
                "Feature '{name}' is not numeric"
            )));
        }
        if column.null_count() > 0 {
            return Err(ChurnError::Analysis(format!(
                "Feature '{name}' contains null values"
            )));
        }
        let series = column.as_materialized_series().cast(&DataType::Float64)?;
        for (cell, value) in matrix.column_mut(j).iter_mut().zip(series.f64()?) {
            *cell = value.unwrap_or(0.0);
        }
    }
    Ok(matrix)
}

/// Population z-score per column; constant columns become zero.
fn standardize(matrix: &Array2<f64>) -> Array2<f64> {
    let mut scaled = matrix.clone();
    for mut column in scaled.columns_mut() {
        let mean = column.mean().unwrap_or(0.0);
        let std = column.std(0.0);
        column.mapv_inplace(|v| if std == 0.0 { 0.0 } else { (v - mean) / std });
    }
    scaled
}

/// Clusters customers on `features` into `k` segments.
pub fn segment_customers(df: &DataFrame, features: &[String], k: usize) -> Result<Segmentation> {
    if features.is_empty() {
        return Err(ChurnError::Analysis("No features given for segmentation".to_owned()));
    }
    if k == 0 || df.height() < k {
        return Err(ChurnError::Analysis(format!(
            "Cannot form {k} segments from {} records",
            df.height()
        )));
    }

    let raw = feature_matrix(df, features)?;
    let scaled = standardize(&raw);

    let targets: Array1<usize> = Array1::zeros(scaled.nrows());
    let dataset = Dataset::new(scaled, targets);
    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(SEGMENTATION_SEED))
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)?;
    let labels: Array1<usize> = model.predict(&dataset);

    let segment_ids: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
    let mut data = df.clone();
    data.with_column(Series::new(SEGMENT_COLUMN.into(), segment_ids))?;

    let churned: Option<Vec<bool>> = if has_column(df, "Churn") {
        let series = df
            .column("Churn")?
            .as_materialized_series()
            .cast(&DataType::String)?;
        Some(series.str()?.into_iter().map(|v| v == Some("Yes")).collect())
    } else {
        None
    };

    let profiles = (0..k)
        .map(|segment| {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == segment)
                .map(|(i, _)| i)
                .collect();
            let customers = members.len();

            let feature_means = features
                .iter()
                .zip(raw.columns())
                .map(|(name, values)| {
                    let sum: f64 = members.iter().filter_map(|&i| values.get(i)).sum();
                    let mean = if customers == 0 { 0.0 } else { sum / customers as f64 };
                    (name.clone(), mean)
                })
                .collect();

            let churn_rate = churned.as_ref().filter(|_| customers > 0).map(|flags| {
                members
                    .iter()
                    .filter(|&&i| flags.get(i).copied().unwrap_or(false))
                    .count() as f64 / customers as f64
            });

            SegmentProfile {
                segment,
                customers,
                feature_means,
                churn_rate,
            }
        })
        .collect();

    tracing::info!("Segmented {} customers into {k} segments", df.height());
    Ok(Segmentation { data, profiles })
}

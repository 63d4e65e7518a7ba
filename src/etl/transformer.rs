//! Cleaning and feature derivation.
//!
//! Every step takes the current frame by reference and returns a new one, so
//! the extracted dataset stays available for logging after the run. Each
//! step also appends a line to the transformer's log.

use crate::error::{ChurnError, Result};
use crate::etl::frame::{has_column, null_count, require_column, unique_rows};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const TENURE_GROUP_COLUMN: &str = "TenureGroup";
pub const CHARGES_GROUP_COLUMN: &str = "ChargesGroup";
pub const TOTAL_SERVICES_COLUMN: &str = "TotalServices";
pub const CLV_COLUMN: &str = "CLV_Estimate";
pub const PROCESSED_AT_COLUMN: &str = "ProcessedAt";

pub const SERVICE_COLUMNS: [&str; 8] = [
    "PhoneService",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CHARGES_UPPER_BOUND: f64 = 120.0;

/// Constant used by [`MissingStrategy::Fill`].
///
/// Numbers fill numeric columns, text fills text columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingStrategy {
    /// Remove any row holding a null
    #[default]
    Drop,
    Fill(FillValue),
    /// Numeric columns only
    Mean,
    /// Numeric columns only
    Median,
    /// Most frequent value; all-null columns stay null
    Mode,
}

impl MissingStrategy {
    fn label(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Fill(_) => "fill",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMethod {
    /// Sorted distinct values mapped to `0..n` in `<col>_Encoded`
    #[default]
    Label,
    /// One `<col>_<value>` indicator column per distinct value
    OneHot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    /// `(x - min) / (max - min)` in `<col>_Normalized`
    #[default]
    MinMax,
    /// `(x - mean) / std` (population) in `<col>_Scaled`
    ZScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Int64,
    Float64,
    String,
    Boolean,
}

impl TargetType {
    pub fn dtype(self) -> DataType {
        match self {
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::String => DataType::String,
            Self::Boolean => DataType::Boolean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub missing_strategy: MissingStrategy,
    /// Columns compared when removing duplicates; all columns when `None`
    pub duplicate_subset: Option<Vec<String>>,
    pub type_map: BTreeMap<String, TargetType>,
    pub clv_multiplier: f64,
    pub encode_columns: Vec<String>,
    pub encoding: EncodingMethod,
    pub scale_columns: Vec<String>,
    pub scaling: ScalingMethod,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            missing_strategy: MissingStrategy::Drop,
            duplicate_subset: None,
            type_map: BTreeMap::new(),
            clv_multiplier: 1.2,
            encode_columns: Vec::new(),
            encoding: EncodingMethod::Label,
            scale_columns: Vec::new(),
            scaling: ScalingMethod::MinMax,
        }
    }
}

/// Tenure bucket, lower bound inclusive.
pub fn tenure_bucket(months: f64) -> Option<&'static str> {
    match months {
        m if (0.0..12.0).contains(&m) => Some("0-12 months"),
        m if (12.0..24.0).contains(&m) => Some("12-24 months"),
        m if (24.0..48.0).contains(&m) => Some("24-48 months"),
        m if m >= 48.0 => Some("48+ months"),
        _ => None,
    }
}

/// Monthly charge bucket, lower bound inclusive; the top bucket includes 120.
pub fn charges_bucket(charge: f64) -> Option<&'static str> {
    match charge {
        c if (0.0..35.0).contains(&c) => Some("Low"),
        c if (35.0..70.0).contains(&c) => Some("Medium"),
        c if (70.0..=CHARGES_UPPER_BOUND).contains(&c) => Some("High"),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn as_f64(df: &DataFrame, column: &str) -> Result<Float64Chunked> {
    require_column(df, column)?;
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

fn as_text(df: &DataFrame, column: &str) -> Result<StringChunked> {
    require_column(df, column)?;
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series.str()?.clone())
}

fn with_series(df: &DataFrame, series: Series) -> Result<DataFrame> {
    let mut out = df.clone();
    out.with_column(series)?;
    Ok(out)
}

fn bucketize(
    df: &DataFrame,
    source: &str,
    target: &str,
    bucket: fn(f64) -> Option<&'static str>,
) -> Result<DataFrame> {
    let values = as_f64(df, source)?;
    let groups: Vec<Option<&str>> = values.into_iter().map(|v| v.and_then(bucket)).collect();
    with_series(df, Series::new(target.into(), groups))
}

#[derive(Debug, Default)]
pub struct Transformer {
    config: TransformConfig,
    log: Vec<String>,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            log: Vec::new(),
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Human-readable record of the steps applied so far.
    pub fn transformation_log(&self) -> &[String] {
        &self.log
    }

    fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.log.push(line);
    }

    /// Trims names and replaces internal spaces with `_`.
    pub fn clean_column_names(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let columns: Vec<Column> = df
            .get_columns()
            .iter()
            .map(|c| {
                let clean = c.name().trim().replace(' ', "_");
                c.clone().with_name(clean.into())
            })
            .collect();
        let out = DataFrame::new(columns)?;
        self.record("Column names cleaned");
        Ok(out)
    }

    pub fn handle_missing_values(
        &mut self,
        df: &DataFrame,
        strategy: &MissingStrategy,
    ) -> Result<DataFrame> {
        let nulls_before = null_count(df);
        let out = match strategy {
            MissingStrategy::Drop => df.drop_nulls::<String>(None)?,
            MissingStrategy::Fill(value) => apply_exprs(df, fill_exprs(df, value))?,
            MissingStrategy::Mean => apply_exprs(df, statistic_fill_exprs(df, |s| s.mean()))?,
            MissingStrategy::Median => {
                apply_exprs(df, statistic_fill_exprs(df, |s| s.median()))?
            }
            MissingStrategy::Mode => {
                let exprs = partially_null(df)
                    .map(|c| {
                        let name = c.name().as_str();
                        // smallest of tied modes
                        let mode = col(name)
                            .drop_nulls()
                            .mode()
                            .sort(SortOptions::default())
                            .first();
                        col(name).fill_null(mode)
                    })
                    .collect();
                apply_exprs(df, exprs)?
            }
        };

        self.record(format!(
            "Missing values handled ({}): {nulls_before} -> {}, rows {} -> {}",
            strategy.label(),
            null_count(&out),
            df.height(),
            out.height()
        ));
        Ok(out)
    }

    /// Keeps the first of each group of rows identical over `subset`.
    pub fn remove_duplicates(
        &mut self,
        df: &DataFrame,
        subset: Option<&[String]>,
    ) -> Result<DataFrame> {
        let out = unique_rows(df, subset)?;
        self.record(format!(
            "Duplicates removed: {}",
            df.height() - out.height()
        ));
        Ok(out)
    }

    /// Casts the named columns; absent columns are ignored and failed casts
    /// leave the column as it was.
    pub fn convert_data_types(
        &mut self,
        df: &DataFrame,
        type_map: &BTreeMap<String, TargetType>,
    ) -> Result<DataFrame> {
        let mut out = df.clone();
        for (name, target) in type_map {
            if !has_column(&out, name) {
                debug!("Skipping type conversion of absent column {name}");
                continue;
            }
            let series = out.column(name)?.as_materialized_series().clone();
            match series.strict_cast(&target.dtype()) {
                Ok(cast) => {
                    out.with_column(cast)?;
                    debug!("{name} converted to {target:?}");
                }
                Err(e) => warn!("Could not convert {name} to {target:?}: {e}"),
            }
        }
        self.record("Data types converted");
        Ok(out)
    }

    pub fn create_tenure_groups(&mut self, df: &DataFrame, column: &str) -> Result<DataFrame> {
        let out = bucketize(df, column, TENURE_GROUP_COLUMN, tenure_bucket)?;
        self.record("Tenure groups created");
        Ok(out)
    }

    pub fn create_charges_groups(&mut self, df: &DataFrame, column: &str) -> Result<DataFrame> {
        let out = bucketize(df, column, CHARGES_GROUP_COLUMN, charges_bucket)?;
        self.record("Charge groups created");
        Ok(out)
    }

    /// Counts `"Yes"` across the service columns that are present.
    pub fn calculate_total_services(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let mut totals = vec![0i64; df.height()];
        for service in SERVICE_COLUMNS {
            if !has_column(df, service) {
                continue;
            }
            for (total, value) in totals.iter_mut().zip(as_text(df, service)?.into_iter()) {
                if value == Some("Yes") {
                    *total += 1;
                }
            }
        }
        let out = with_series(df, Series::new(TOTAL_SERVICES_COLUMN.into(), totals))?;
        self.record("Total services calculated");
        Ok(out)
    }

    /// `CLV_Estimate = column * multiplier`, rounded to cents.
    pub fn calculate_clv(
        &mut self,
        df: &DataFrame,
        column: &str,
        multiplier: f64,
    ) -> Result<DataFrame> {
        let clv: Vec<Option<f64>> = as_f64(df, column)?
            .into_iter()
            .map(|v| v.map(|x| round2(x * multiplier)))
            .collect();
        let out = with_series(df, Series::new(CLV_COLUMN.into(), clv))?;
        self.record("CLV calculated");
        Ok(out)
    }

    /// Adds encoded columns next to the originals.
    pub fn encode_categorical(
        &mut self,
        df: &DataFrame,
        columns: &[String],
        method: EncodingMethod,
    ) -> Result<DataFrame> {
        for name in columns {
            require_column(df, name)?;
        }

        let mut out = df.clone();
        for name in columns {
            let values = as_text(df, name)?;
            let categories: BTreeSet<&str> = values.into_iter().flatten().collect();

            match method {
                EncodingMethod::Label => {
                    let index: BTreeMap<&str, i64> = categories
                        .iter()
                        .zip(0i64..)
                        .map(|(category, code)| (*category, code))
                        .collect();
                    let codes: Vec<Option<i64>> = values
                        .into_iter()
                        .map(|v| v.and_then(|v| index.get(v).copied()))
                        .collect();
                    out.with_column(Series::new(format!("{name}_Encoded").into(), codes))?;
                }
                EncodingMethod::OneHot => {
                    for category in &categories {
                        let indicator: Vec<i64> = values
                            .into_iter()
                            .map(|v| i64::from(v == Some(*category)))
                            .collect();
                        out.with_column(Series::new(
                            format!("{name}_{category}").into(),
                            indicator,
                        ))?;
                    }
                }
            }
        }

        self.record(format!("Categorical encoding: {method:?}"));
        Ok(out)
    }

    /// Adds scaled copies of numeric columns next to the originals.
    pub fn scale_numeric(
        &mut self,
        df: &DataFrame,
        columns: &[String],
        method: ScalingMethod,
    ) -> Result<DataFrame> {
        for name in columns {
            require_column(df, name)?;
            if !df.column(name)?.dtype().is_numeric() {
                return Err(ChurnError::DataProcessing(format!(
                    "Cannot scale non-numeric column '{name}'"
                )));
            }
        }

        let mut out = df.clone();
        for name in columns {
            let values = as_f64(df, name)?;
            let (target, scaled): (String, Vec<Option<f64>>) = match method {
                ScalingMethod::MinMax => {
                    let min = values.min().unwrap_or(0.0);
                    let range = values.max().unwrap_or(0.0) - min;
                    let scaled = values
                        .into_iter()
                        .map(|v| v.map(|x| if range == 0.0 { 0.0 } else { (x - min) / range }))
                        .collect();
                    (format!("{name}_Normalized"), scaled)
                }
                ScalingMethod::ZScore => {
                    let mean = values.mean().unwrap_or(0.0);
                    let std = values.std(0).unwrap_or(0.0);
                    let scaled = values
                        .into_iter()
                        .map(|v| v.map(|x| if std == 0.0 { 0.0 } else { (x - mean) / std }))
                        .collect();
                    (format!("{name}_Scaled"), scaled)
                }
            };
            out.with_column(Series::new(target.into(), scaled))?;
        }

        self.record(format!("Numeric scaling: {method:?}"));
        Ok(out)
    }

    pub fn add_timestamp(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let stamps = vec![now; df.height()];
        let out = with_series(df, Series::new(PROCESSED_AT_COLUMN.into(), stamps))?;
        self.record("Processing timestamp added");
        Ok(out)
    }

    /// Runs every configured step in order.
    ///
    /// Derived columns whose source column is absent are skipped; any other
    /// failure aborts the remaining steps.
    pub fn apply_all(&mut self, df: &DataFrame) -> Result<DataFrame> {
        info!(
            "Transforming {} records x {} columns",
            df.height(),
            df.width()
        );
        let config = self.config.clone();

        let mut out = self.clean_column_names(df)?;
        out = self.handle_missing_values(&out, &config.missing_strategy)?;
        out = self.remove_duplicates(&out, config.duplicate_subset.as_deref())?;

        if !config.type_map.is_empty() {
            out = self.convert_data_types(&out, &config.type_map)?;
        }

        if has_column(&out, "tenure") {
            out = self.create_tenure_groups(&out, "tenure")?;
        } else {
            debug!("No tenure column, skipping tenure groups");
        }

        if has_column(&out, "MonthlyCharges") {
            out = self.create_charges_groups(&out, "MonthlyCharges")?;
        } else {
            debug!("No MonthlyCharges column, skipping charge groups");
        }

        out = self.calculate_total_services(&out)?;

        if has_column(&out, "TotalCharges") {
            out = self.calculate_clv(&out, "TotalCharges", config.clv_multiplier)?;
        } else {
            debug!("No TotalCharges column, skipping CLV");
        }

        if !config.encode_columns.is_empty() {
            out = self.encode_categorical(&out, &config.encode_columns, config.encoding)?;
        }
        if !config.scale_columns.is_empty() {
            out = self.scale_numeric(&out, &config.scale_columns, config.scaling)?;
        }

        out = self.add_timestamp(&out)?;

        info!(
            "Transformations complete: records {} -> {}, columns {} -> {}",
            df.height(),
            out.height(),
            df.width(),
            out.width()
        );
        Ok(out)
    }
}

fn apply_exprs(df: &DataFrame, exprs: Vec<Expr>) -> Result<DataFrame> {
    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

fn fill_exprs(df: &DataFrame, value: &FillValue) -> Vec<Expr> {
    df.get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .filter_map(|c| {
            let name = c.name().as_str();
            let dtype = c.dtype();
            match value {
                FillValue::Number(n) if dtype.is_numeric() => {
                    let fill = if n.fract() == 0.0 {
                        lit(*n).cast(dtype.clone())
                    } else {
                        lit(*n)
                    };
                    Some(col(name).fill_null(fill))
                }
                FillValue::Text(s) if dtype == &DataType::String => {
                    Some(col(name).fill_null(lit(s.clone())))
                }
                _ => None,
            }
        })
        .collect()
}

/// Columns holding some, but not only, nulls.
fn partially_null(df: &DataFrame) -> impl Iterator<Item = &Column> {
    df.get_columns()
        .iter()
        .filter(|c| c.null_count() > 0 && c.null_count() < c.len())
}

/// Fills numeric columns with a per-column statistic, keeping each column's
/// dtype; integer columns get the statistic rounded. Columns without nulls
/// are left untouched.
fn statistic_fill_exprs(df: &DataFrame, statistic: fn(&Series) -> Option<f64>) -> Vec<Expr> {
    partially_null(df)
        .filter(|c| c.dtype().is_numeric())
        .filter_map(|c| {
            let value = statistic(c.as_materialized_series())?;
            let value = if c.dtype().is_integer() {
                value.round()
            } else {
                value
            };
            Some(col(c.name().as_str()).fill_null(lit(value).cast(c.dtype().clone())))
        })
        .collect()
}

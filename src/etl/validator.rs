//! Data-quality checks.
//!
//! A [`Validator`] never aborts on a failed check. Each check returns whether
//! it passed and appends its findings to the validator's error or warning
//! list; [`Validator::run_full_validation`] runs the standard suite and
//! gathers everything into a [`ValidationReport`].

use crate::error::Result;
use crate::etl::frame::{duplicate_count, has_column, null_count, numeric_columns};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Declared column type for [`Validator::validate_data_types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedType {
    Integer,
    Float,
    /// Integer or float
    Numeric,
    Text,
    Boolean,
}

impl ExpectedType {
    pub fn matches(self, dtype: &DataType) -> bool {
        match self {
            Self::Integer => dtype.is_integer(),
            Self::Float => dtype.is_float(),
            Self::Numeric => dtype.is_numeric(),
            Self::Text => matches!(dtype, DataType::String),
            Self::Boolean => dtype.is_bool(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    #[default]
    Warning,
}

/// Inclusive bounds for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalRule {
    pub column: String,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Column whose values must be unique; skipped when `None` or absent
    pub id_column: Option<String>,
    pub iqr_multiplier: f64,
    pub monthly_charges_column: String,
    pub total_charges_column: String,
    pub tenure_column: String,
    pub tenure_min: f64,
    pub tenure_max: f64,
    /// Fraction of `MonthlyCharges * tenure` that `TotalCharges` should reach
    pub total_charges_ratio: f64,
    pub churn_column: String,
    pub churn_values: Vec<String>,
    pub expected_types: BTreeMap<String, ExpectedType>,
    pub ranges: Vec<RangeRule>,
    pub categoricals: Vec<CategoricalRule>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            id_column: Some("CustomerID".to_owned()),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            monthly_charges_column: "MonthlyCharges".to_owned(),
            total_charges_column: "TotalCharges".to_owned(),
            tenure_column: "tenure".to_owned(),
            tenure_min: 1.0,
            tenure_max: 72.0,
            total_charges_ratio: 0.8,
            churn_column: "Churn".to_owned(),
            churn_values: vec!["Yes".to_owned(), "No".to_owned()],
            expected_types: BTreeMap::new(),
            ranges: Vec::new(),
            categoricals: Vec::new(),
        }
    }
}

/// Result of an IQR outlier scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierScan {
    pub count: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub total_records: usize,
    pub total_columns: usize,
    pub has_nulls: bool,
    pub null_count: usize,
    pub has_duplicates: bool,
    pub duplicate_count: usize,
    /// `None` when no ID column was checked
    pub unique_ids: Option<bool>,
    pub business_rules_valid: bool,
    /// Outlier counts per numeric column; columns without outliers are omitted
    pub outliers: BTreeMap<String, usize>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn numeric_values(df: &DataFrame, column: &str) -> Result<Float64Chunked> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

fn format_bound(bound: Option<f64>, unbounded: &str) -> String {
    bound.map_or_else(|| unbounded.to_owned(), |b| b.to_string())
}

#[derive(Debug, Default)]
pub struct Validator {
    config: ValidationConfig,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn reset(&mut self) {
        self.errors.clear();
        self.warnings.clear();
    }

    fn fail(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => {
                warn!("Validation error: {message}");
                self.errors.push(message);
            }
            Severity::Warning => {
                warn!("Validation warning: {message}");
                self.warnings.push(message);
            }
        }
    }

    fn missing_column(&mut self, column: &str) -> bool {
        self.fail(Severity::Error, format!("Column {column} does not exist"));
        false
    }

    /// Checks `columns` (all columns when `None`) for nulls.
    pub fn validate_no_nulls(&mut self, df: &DataFrame, columns: Option<&[String]>) -> Result<bool> {
        if let Some(missing) = columns.and_then(|c| c.iter().find(|n| !has_column(df, n))) {
            return Ok(self.missing_column(missing));
        }

        let mut with_nulls = BTreeMap::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if let Some(wanted) = columns
                && !wanted.iter().any(|w| w == name)
            {
                continue;
            }
            if column.null_count() > 0 {
                with_nulls.insert(name.to_owned(), column.null_count());
            }
        }
        if with_nulls.is_empty() {
            info!("No null values");
            Ok(true)
        } else {
            self.fail(Severity::Error, format!("Null values found in: {with_nulls:?}"));
            Ok(false)
        }
    }

    pub fn validate_no_duplicates(
        &mut self,
        df: &DataFrame,
        subset: Option<&[String]>,
    ) -> Result<bool> {
        if let Some(missing) = subset.and_then(|s| s.iter().find(|n| !has_column(df, n))) {
            return Ok(self.missing_column(missing));
        }
        let duplicates = duplicate_count(df, subset)?;
        if duplicates == 0 {
            info!("No duplicate records");
            Ok(true)
        } else {
            self.fail(Severity::Error, format!("Duplicate records found: {duplicates}"));
            Ok(false)
        }
    }

    /// One error per column whose dtype does not match; absent columns are skipped.
    pub fn validate_data_types(
        &mut self,
        df: &DataFrame,
        expected: &BTreeMap<String, ExpectedType>,
    ) -> bool {
        let mut valid = true;
        for (name, expected_type) in expected {
            let Ok(column) = df.column(name) else {
                continue;
            };
            if !expected_type.matches(column.dtype()) {
                self.fail(
                    Severity::Error,
                    format!("{name}: expected {expected_type:?}, actual {}", column.dtype()),
                );
                valid = false;
            }
        }
        if valid {
            info!("Column types match");
        }
        valid
    }

    /// Inclusive range check; nulls are not counted as violations.
    pub fn validate_value_range(
        &mut self,
        df: &DataFrame,
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
        severity: Severity,
    ) -> Result<bool> {
        if !has_column(df, column) {
            return Ok(self.missing_column(column));
        }
        let out_of_range = numeric_values(df, column)?
            .into_iter()
            .flatten()
            .filter(|v| min.is_some_and(|m| *v < m) || max.is_some_and(|m| *v > m))
            .count();

        if out_of_range == 0 {
            info!("{column} within range");
            Ok(true)
        } else {
            self.fail(
                severity,
                format!(
                    "{column}: {out_of_range} values out of range [{}, {}]",
                    format_bound(min, "-inf"),
                    format_bound(max, "inf")
                ),
            );
            Ok(false)
        }
    }

    pub fn validate_unique_id(&mut self, df: &DataFrame, id_column: &str) -> Result<bool> {
        if !has_column(df, id_column) {
            return Ok(self.missing_column(id_column));
        }
        let unique = df.column(id_column)?.as_materialized_series().n_unique()?;
        let duplicates = df.height().saturating_sub(unique);
        if duplicates == 0 {
            info!("All {id_column} values are unique");
            Ok(true)
        } else {
            self.fail(Severity::Error, format!("{id_column}: {duplicates} duplicate IDs"));
            Ok(false)
        }
    }

    /// Every value, nulls included, must be one of `allowed`.
    pub fn validate_categorical_values(
        &mut self,
        df: &DataFrame,
        column: &str,
        allowed: &[String],
    ) -> Result<bool> {
        if !has_column(df, column) {
            return Ok(self.missing_column(column));
        }
        let values = df
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let invalid: BTreeSet<String> = values
            .str()?
            .into_iter()
            .filter(|v| !v.is_some_and(|v| allowed.iter().any(|a| a == v)))
            .map(|v| v.unwrap_or("null").to_owned())
            .collect();

        if invalid.is_empty() {
            info!("{column} values are valid");
            Ok(true)
        } else {
            self.fail(Severity::Error, format!("{column}: invalid values {invalid:?}"));
            Ok(false)
        }
    }

    /// Flags values outside `[Q1 - k*IQR, Q3 + k*IQR]`; found outliers are a warning.
    pub fn detect_outliers_iqr(
        &mut self,
        df: &DataFrame,
        column: &str,
        k: f64,
    ) -> Result<OutlierScan> {
        let empty = OutlierScan {
            count: 0,
            lower_bound: f64::NAN,
            upper_bound: f64::NAN,
        };
        if !has_column(df, column) {
            return Ok(empty);
        }
        let values = numeric_values(df, column)?;
        let (Some(q1), Some(q3)) = (
            values.quantile(0.25, QuantileMethod::Linear)?,
            values.quantile(0.75, QuantileMethod::Linear)?,
        ) else {
            return Ok(empty);
        };

        let iqr = q3 - q1;
        let lower_bound = q1 - k * iqr;
        let upper_bound = q3 + k * iqr;
        let count = values
            .into_iter()
            .flatten()
            .filter(|v| *v < lower_bound || *v > upper_bound)
            .count();

        if count > 0 {
            self.fail(Severity::Warning, format!("{column}: {count} outliers detected"));
        }
        Ok(OutlierScan {
            count,
            lower_bound,
            upper_bound,
        })
    }

    /// Telecom rules; each applies only when its columns are present.
    pub fn validate_business_rules(&mut self, df: &DataFrame) -> Result<bool> {
        let config = self.config.clone();
        let mut valid = true;

        if has_column(df, &config.monthly_charges_column) {
            let non_positive = numeric_values(df, &config.monthly_charges_column)?
                .into_iter()
                .flatten()
                .filter(|v| *v <= 0.0)
                .count();
            if non_positive > 0 {
                self.fail(
                    Severity::Error,
                    format!(
                        "{} <= 0: {non_positive} records",
                        config.monthly_charges_column
                    ),
                );
                valid = false;
            }
        }

        let charge_columns = [
            &config.total_charges_column,
            &config.monthly_charges_column,
            &config.tenure_column,
        ];
        if charge_columns.iter().all(|c| has_column(df, c)) {
            let total = numeric_values(df, &config.total_charges_column)?;
            let monthly = numeric_values(df, &config.monthly_charges_column)?;
            let tenure = numeric_values(df, &config.tenure_column)?;
            let inconsistent = total
                .into_iter()
                .zip(monthly.into_iter())
                .zip(tenure.into_iter())
                .filter(|((t, m), n)| match (t, m, n) {
                    (Some(t), Some(m), Some(n)) => *t < m * n * config.total_charges_ratio,
                    _ => false,
                })
                .count();
            if inconsistent > 0 {
                self.fail(
                    Severity::Warning,
                    format!(
                        "{} inconsistent: {inconsistent} records",
                        config.total_charges_column
                    ),
                );
            }
        }

        if has_column(df, &config.tenure_column)
            && !self.validate_value_range(
                df,
                &config.tenure_column,
                Some(config.tenure_min),
                Some(config.tenure_max),
                Severity::Error,
            )?
        {
            valid = false;
        }

        if has_column(df, &config.churn_column)
            && !self.validate_categorical_values(df, &config.churn_column, &config.churn_values)?
        {
            valid = false;
        }

        Ok(valid)
    }

    /// Runs the standard suite, clearing findings from earlier runs first.
    pub fn run_full_validation(&mut self, df: &DataFrame) -> Result<ValidationReport> {
        self.reset();
        let config = self.config.clone();

        let nulls = null_count(df);
        let duplicates = duplicate_count(df, None)?;

        let unique_ids = match &config.id_column {
            Some(id) if has_column(df, id) => Some(self.validate_unique_id(df, id)?),
            _ => None,
        };

        if !config.expected_types.is_empty() {
            self.validate_data_types(df, &config.expected_types);
        }
        for rule in &config.ranges {
            self.validate_value_range(df, &rule.column, rule.min, rule.max, rule.severity)?;
        }
        for rule in &config.categoricals {
            self.validate_categorical_values(df, &rule.column, &rule.allowed)?;
        }

        let business_rules_valid = self.validate_business_rules(df)?;

        let mut outliers = BTreeMap::new();
        for column in numeric_columns(df) {
            let scan = self.detect_outliers_iqr(df, &column, config.iqr_multiplier)?;
            if scan.count > 0 {
                outliers.insert(column, scan.count);
            }
        }

        let report = ValidationReport {
            total_records: df.height(),
            total_columns: df.width(),
            has_nulls: nulls > 0,
            null_count: nulls,
            has_duplicates: duplicates > 0,
            duplicate_count: duplicates,
            unique_ids,
            business_rules_valid,
            outliers,
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
        };

        info!(
            "Validation finished: {} records, {} errors, {} warnings",
            report.total_records,
            report.errors.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}

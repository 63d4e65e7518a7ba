use super::customers;
use crate::etl::mock;
use crate::etl::transformer::{TransformConfig, Transformer};
use crate::etl::validator::*;
use anyhow::Result;
use pretty_assertions::assert_eq;
use polars::prelude::*;
use std::collections::BTreeMap;

fn validator() -> Validator {
    Validator::new(ValidationConfig::default())
}

#[test]
fn test_non_positive_monthly_charge_is_one_error() -> Result<()> {
    let df = df!("MonthlyCharges" => [-5.0, 50.0])?;
    let mut v = validator();
    assert!(!v.validate_business_rules(&df)?);
    assert_eq!(v.errors(), ["MonthlyCharges <= 0: 1 records"]);
    assert!(v.warnings().is_empty());
    Ok(())
}

#[test]
fn test_repeated_id_fails_unique_check() -> Result<()> {
    let ids: Vec<String> = (1..=9)
        .map(|i| format!("C{i}"))
        .chain(std::iter::once("C3".to_owned()))
        .collect();
    let df = df!("CustomerID" => ids)?;

    let mut v = validator();
    assert!(!v.validate_unique_id(&df, "CustomerID")?);
    assert_eq!(v.errors().len(), 1);
    assert!(v.errors()[0].contains("1 duplicate"), "{:?}", v.errors());
    Ok(())
}

#[test]
fn test_iqr_flags_only_the_extreme_value() -> Result<()> {
    let df = df!("x" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0])?;
    let mut v = validator();
    let scan = v.detect_outliers_iqr(&df, "x", DEFAULT_IQR_MULTIPLIER)?;

    assert_eq!(scan.count, 1);
    assert!(scan.upper_bound < 100.0);
    assert!(scan.upper_bound > 5.0);
    assert!(scan.lower_bound < 1.0);
    assert!(v.errors().is_empty());
    assert_eq!(v.warnings(), ["x: 1 outliers detected"]);
    Ok(())
}

#[test]
fn test_iqr_on_absent_or_empty_column() -> Result<()> {
    let mut v = validator();
    let df = df!("x" => Vec::<f64>::new())?;
    assert_eq!(v.detect_outliers_iqr(&df, "x", 1.5)?.count, 0);
    assert_eq!(v.detect_outliers_iqr(&df, "missing", 1.5)?.count, 0);
    assert!(v.warnings().is_empty());
    Ok(())
}

#[test]
fn test_missing_column_is_reported() -> Result<()> {
    let df = df!("a" => [1i64])?;
    let mut v = validator();
    assert!(!v.validate_value_range(&df, "tenure", Some(1.0), None, Severity::Warning)?);
    assert!(!v.validate_categorical_values(&df, "Churn", &["Yes".to_owned()])?);
    assert!(!v.validate_no_nulls(&df, Some(&["b".to_owned()]))?);
    assert_eq!(v.errors()[0], "Column tenure does not exist");
    assert_eq!(v.errors().len(), 3);
    Ok(())
}

#[test]
fn test_range_severity() -> Result<()> {
    let df = df!("tenure" => [0i64, 5, 80])?;
    let mut v = validator();

    assert!(!v.validate_value_range(&df, "tenure", Some(1.0), Some(72.0), Severity::Warning)?);
    assert_eq!(v.warnings(), ["tenure: 2 values out of range [1, 72]"]);
    assert!(v.errors().is_empty());

    assert!(!v.validate_value_range(&df, "tenure", Some(1.0), None, Severity::Error)?);
    assert_eq!(v.errors(), ["tenure: 1 values out of range [1, inf]"]);

    v.reset();
    assert!(v.validate_value_range(&df, "tenure", None, Some(100.0), Severity::Error)?);
    assert!(v.errors().is_empty() && v.warnings().is_empty());
    Ok(())
}

#[test]
fn test_nulls_and_duplicates() -> Result<()> {
    let df = df!(
        "a" => [Some(1i64), Some(1), None],
        "b" => ["x", "x", "y"]
    )?;
    let mut v = validator();
    assert!(!v.validate_no_nulls(&df, None)?);
    assert!(v.validate_no_nulls(&df, Some(&["b".to_owned()]))?);
    assert!(!v.validate_no_duplicates(&df, None)?);
    assert!(v.errors().iter().any(|e| e == "Duplicate records found: 1"));
    Ok(())
}

#[test]
fn test_data_types() -> Result<()> {
    let df = customers()?;
    let mut expected = BTreeMap::new();
    expected.insert("tenure".to_owned(), ExpectedType::Integer);
    expected.insert("MonthlyCharges".to_owned(), ExpectedType::Numeric);
    expected.insert("Churn".to_owned(), ExpectedType::Text);
    expected.insert("Absent".to_owned(), ExpectedType::Boolean);

    let mut v = validator();
    assert!(v.validate_data_types(&df, &expected));

    expected.insert("CustomerID".to_owned(), ExpectedType::Float);
    assert!(!v.validate_data_types(&df, &expected));
    assert_eq!(v.errors().len(), 1);
    assert!(v.errors()[0].starts_with("CustomerID: expected Float"));
    Ok(())
}

#[test]
fn test_categorical_treats_null_as_invalid() -> Result<()> {
    let df = df!("Churn" => [Some("Yes"), None, Some("No")])?;
    let mut v = validator();
    let allowed = ["Yes".to_owned(), "No".to_owned()];
    assert!(!v.validate_categorical_values(&df, "Churn", &allowed)?);
    assert!(v.errors()[0].contains("null"));
    Ok(())
}

#[test]
fn test_inconsistent_total_charges_is_a_warning() -> Result<()> {
    let df = df!(
        "MonthlyCharges" => [50.0, 50.0],
        "tenure" => [10i64, 10],
        "TotalCharges" => [500.0, 100.0]
    )?;
    let mut v = validator();
    assert!(v.validate_business_rules(&df)?);
    assert!(v.errors().is_empty());
    assert_eq!(v.warnings(), ["TotalCharges inconsistent: 1 records"]);
    Ok(())
}

#[test]
fn test_business_rules_check_tenure_and_churn() -> Result<()> {
    let df = df!(
        "tenure" => [0i64, 10],
        "Churn" => ["Yes", "Maybe"]
    )?;
    let mut v = validator();
    assert!(!v.validate_business_rules(&df)?);
    assert_eq!(v.errors().len(), 2);
    Ok(())
}

#[test]
fn test_full_validation_on_clean_data() -> Result<()> {
    let mut v = validator();
    let report = v.run_full_validation(&customers()?)?;
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.total_records, 5);
    assert_eq!(report.unique_ids, Some(true));
    assert!(report.business_rules_valid);
    assert!(!report.has_nulls);
    assert!(!report.has_duplicates);
    Ok(())
}

#[test]
fn test_full_validation_resets_between_runs() -> Result<()> {
    let bad = df!(
        "CustomerID" => ["A", "A"],
        "MonthlyCharges" => [0.0, 10.0]
    )?;
    let mut v = validator();
    let first = v.run_full_validation(&bad)?;
    assert_eq!(first.errors.len(), 2);
    assert_eq!(first.unique_ids, Some(false));

    let second = v.run_full_validation(&customers()?)?;
    assert!(second.is_valid());
    assert_eq!(v.errors().len(), 0);
    Ok(())
}

#[test]
fn test_full_validation_applies_configured_rules() -> Result<()> {
    let config = ValidationConfig {
        id_column: None,
        ranges: vec![RangeRule {
            column: "MonthlyCharges".to_owned(),
            min: Some(0.0),
            max: Some(100.0),
            severity: Severity::Error,
        }],
        categoricals: vec![CategoricalRule {
            column: "Contract".to_owned(),
            allowed: vec!["Month-to-month".to_owned(), "One year".to_owned()],
        }],
        ..ValidationConfig::default()
    };
    let mut v = Validator::new(config);
    let report = v.run_full_validation(&customers()?)?;
    assert_eq!(report.unique_ids, None);
    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    assert!(!report.is_valid());
    Ok(())
}

#[test]
fn test_full_validation_on_transformed_mock_data() -> Result<()> {
    let raw = mock::generate(500, 42)?;
    let processed = Transformer::new(TransformConfig::default()).apply_all(&raw)?;
    let report = validator().run_full_validation(&processed)?;

    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.total_records, 500);
    assert_eq!(report.unique_ids, Some(true));
    // outliers only ever produce warnings
    assert!(report.outliers.values().all(|n| *n > 0));
    Ok(())
}

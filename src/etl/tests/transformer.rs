use super::customers;
use crate::error::ChurnError;
use crate::etl::frame::{duplicate_count, null_count};
use crate::etl::mock;
use crate::etl::transformer::*;
use crate::etl::validator::{ExpectedType, ValidationConfig, Validator};
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;

fn transformer() -> Transformer {
    Transformer::new(TransformConfig::default())
}

fn with_gaps() -> PolarsResult<DataFrame> {
    df!(
        "tenure" => [Some(10i64), None, Some(30), Some(50)],
        "MonthlyCharges" => [Some(20.0), Some(40.0), None, Some(80.0)],
        "Contract" => [Some("One year"), Some("One year"), Some("Two year"), None]
    )
}

fn strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect())
}

#[test]
fn test_bucket_edges() {
    assert_eq!(tenure_bucket(0.0), Some("0-12 months"));
    assert_eq!(tenure_bucket(11.9), Some("0-12 months"));
    assert_eq!(tenure_bucket(12.0), Some("12-24 months"));
    assert_eq!(tenure_bucket(24.0), Some("24-48 months"));
    assert_eq!(tenure_bucket(48.0), Some("48+ months"));
    assert_eq!(tenure_bucket(500.0), Some("48+ months"));
    assert_eq!(tenure_bucket(-1.0), None);

    assert_eq!(charges_bucket(0.0), Some("Low"));
    assert_eq!(charges_bucket(35.0), Some("Medium"));
    assert_eq!(charges_bucket(69.99), Some("Medium"));
    assert_eq!(charges_bucket(70.0), Some("High"));
    assert_eq!(charges_bucket(120.0), Some("High"));
    assert_eq!(charges_bucket(120.01), None);
    assert_eq!(charges_bucket(-3.0), None);
}

#[test]
fn test_clean_column_names() -> Result<()> {
    let df = df!(" Monthly Charges " => [1.0], "tenure" => [2i64])?;
    let out = transformer().clean_column_names(&df)?;
    let names: Vec<&str> = out.get_column_names().iter().map(|s| s.as_str()).collect();
    assert_eq!(names, ["Monthly_Charges", "tenure"]);
    Ok(())
}

#[test]
fn test_drop_leaves_no_nulls() -> Result<()> {
    let mut t = transformer();
    let out = t.handle_missing_values(&with_gaps()?, &MissingStrategy::Drop)?;
    assert_eq!(out.height(), 1);
    assert_eq!(null_count(&out), 0);
    let line = &t.transformation_log()[0];
    assert!(line.contains("3 -> 0"), "{line}");
    assert!(line.contains("rows 4 -> 1"), "{line}");
    Ok(())
}

#[test]
fn test_fill_constant_matches_column_types() -> Result<()> {
    let df = with_gaps()?;
    let numeric = transformer().handle_missing_values(&df, &MissingStrategy::Fill(FillValue::Number(0.0)))?;
    assert_eq!(numeric.column("tenure")?.dtype(), &DataType::Int64);
    assert_eq!(numeric.column("tenure")?.null_count(), 0);
    assert_eq!(numeric.column("MonthlyCharges")?.null_count(), 0);
    // text columns are left alone by a numeric fill
    assert_eq!(numeric.column("Contract")?.null_count(), 1);

    let text = transformer().handle_missing_values(
        &df,
        &MissingStrategy::Fill(FillValue::Text("Unknown".to_owned())),
    )?;
    assert_eq!(strings(&text, "Contract")?[3].as_deref(), Some("Unknown"));
    assert_eq!(text.column("tenure")?.null_count(), 1);
    Ok(())
}

#[test]
fn test_mean_and_median_fill_numeric_columns() -> Result<()> {
    let df = with_gaps()?;
    let mean = transformer().handle_missing_values(&df, &MissingStrategy::Mean)?;
    assert_eq!(floats(&mean, "tenure")?[1], Some(30.0));
    assert_eq!(mean.column("tenure")?.dtype(), &DataType::Int64);
    let filled = floats(&mean, "MonthlyCharges")?[2].unwrap();
    assert!((filled - 140.0 / 3.0).abs() < 1e-9);

    let median = transformer().handle_missing_values(&df, &MissingStrategy::Median)?;
    assert_eq!(floats(&median, "MonthlyCharges")?[2], Some(40.0));
    assert_eq!(median.column("Contract")?.null_count(), 1);
    Ok(())
}

#[test]
fn test_statistic_fill_keeps_integer_dtypes() -> Result<()> {
    let df = df!(
        "tenure" => [1i64, 24, 60],
        "SeniorCitizen" => [0i64, 1, 0],
        "MonthlyCharges" => [Some(20.0), None, Some(40.0)],
        "Dependents" => [Some(1i64), None, Some(2)]
    )?;

    for strategy in [MissingStrategy::Mean, MissingStrategy::Median] {
        let mut t = transformer();
        let out = t.handle_missing_values(&df, &strategy)?;
        assert_eq!(out.column("tenure")?.dtype(), &DataType::Int64);
        assert_eq!(out.column("SeniorCitizen")?.dtype(), &DataType::Int64);
        assert_eq!(out.column("MonthlyCharges")?.dtype(), &DataType::Float64);
        // 1.5 rounds to 2
        assert_eq!(out.column("Dependents")?.dtype(), &DataType::Int64);
        assert_eq!(floats(&out, "Dependents")?[1], Some(2.0));
        assert_eq!(floats(&out, "MonthlyCharges")?[1], Some(30.0));

        let mut expected = BTreeMap::new();
        expected.insert("tenure".to_owned(), ExpectedType::Integer);
        expected.insert("SeniorCitizen".to_owned(), ExpectedType::Integer);
        let mut v = Validator::new(ValidationConfig::default());
        assert!(v.validate_data_types(&out, &expected), "{:?}", v.errors());
    }
    Ok(())
}

#[test]
fn test_mode_fill_picks_smallest_of_tied_values() -> Result<()> {
    let df = df!("Plan" => [Some("b"), Some("a"), Some("a"), Some("b"), None, Some("c")])?;
    for _ in 0..20 {
        let out = transformer().handle_missing_values(&df, &MissingStrategy::Mode)?;
        assert_eq!(strings(&out, "Plan")?[4].as_deref(), Some("a"));
    }
    Ok(())
}

#[test]
fn test_mode_fill_uses_most_frequent_value() -> Result<()> {
    let out = transformer().handle_missing_values(&with_gaps()?, &MissingStrategy::Mode)?;
    assert_eq!(strings(&out, "Contract")?[3].as_deref(), Some("One year"));
    Ok(())
}

#[test]
fn test_remove_duplicates_keeps_first() -> Result<()> {
    let df = df!(
        "CustomerID" => ["A", "B", "A", "C", "B"],
        "tenure" => [1i64, 2, 1, 3, 9]
    )?;
    let mut t = transformer();

    let full = t.remove_duplicates(&df, None)?;
    assert_eq!(full.height(), 4);
    assert_eq!(duplicate_count(&full, None)?, 0);

    let by_id = t.remove_duplicates(&df, Some(&["CustomerID".to_owned()]))?;
    assert_eq!(strings(&by_id, "CustomerID")?.len(), 3);
    assert_eq!(floats(&by_id, "tenure")?, [Some(1.0), Some(2.0), Some(3.0)]);
    assert!(by_id.height() <= df.height());
    Ok(())
}

#[test]
fn test_convert_data_types_skips_failures() -> Result<()> {
    let df = df!(
        "TotalCharges" => ["10.5", "20", "30.25"],
        "Notes" => ["a", "b", "c"]
    )?;
    let mut type_map = BTreeMap::new();
    type_map.insert("TotalCharges".to_owned(), TargetType::Float64);
    type_map.insert("Notes".to_owned(), TargetType::Int64);
    type_map.insert("Absent".to_owned(), TargetType::Boolean);

    let out = transformer().convert_data_types(&df, &type_map)?;
    assert_eq!(out.column("TotalCharges")?.dtype(), &DataType::Float64);
    assert_eq!(out.column("Notes")?.dtype(), &DataType::String);
    Ok(())
}

#[test]
fn test_derived_columns() -> Result<()> {
    let mut t = transformer();
    let df = customers()?;
    let out = t.create_tenure_groups(&df, "tenure")?;
    let out = t.create_charges_groups(&out, "MonthlyCharges")?;
    let out = t.calculate_total_services(&out)?;
    let out = t.calculate_clv(&out, "TotalCharges", 1.2)?;

    assert_eq!(
        strings(&out, TENURE_GROUP_COLUMN)?,
        ["0-12 months", "12-24 months", "24-48 months", "48+ months", "48+ months"]
            .map(|s| Some(s.to_owned()))
    );
    assert_eq!(
        strings(&out, CHARGES_GROUP_COLUMN)?,
        ["Low", "Medium", "Medium", "High", "High"].map(|s| Some(s.to_owned()))
    );
    assert_eq!(floats(&out, TOTAL_SERVICES_COLUMN)?, [1.0, 2.0, 0.0, 2.0, 2.0].map(Some));
    assert_eq!(floats(&out, CLV_COLUMN)?[1], Some(504.0));
    assert_eq!(t.transformation_log().len(), 4);
    Ok(())
}

#[test]
fn test_bucketing_is_idempotent() -> Result<()> {
    let mut t = transformer();
    let once = t.create_tenure_groups(&customers()?, "tenure")?;
    let twice = t.create_tenure_groups(&once, "tenure")?;
    assert!(once.equals(&twice));
    Ok(())
}

#[test]
fn test_missing_source_column_is_an_error() {
    let df = df!("other" => [1i64]).unwrap();
    let result = transformer().create_tenure_groups(&df, "tenure");
    assert!(matches!(result, Err(ChurnError::MissingColumn(c)) if c == "tenure"));
}

#[test]
fn test_label_and_one_hot_encoding() -> Result<()> {
    let df = customers()?;
    let columns = ["Contract".to_owned()];

    let labels = transformer().encode_categorical(&df, &columns, EncodingMethod::Label)?;
    assert_eq!(
        floats(&labels, "Contract_Encoded")?,
        [0.0, 1.0, 2.0, 1.0, 2.0].map(Some)
    );

    let one_hot = transformer().encode_categorical(&df, &columns, EncodingMethod::OneHot)?;
    assert_eq!(one_hot.width(), df.width() + 3);
    assert_eq!(
        floats(&one_hot, "Contract_Two year")?,
        [0.0, 0.0, 1.0, 0.0, 1.0].map(Some)
    );
    Ok(())
}

#[test]
fn test_scaling() -> Result<()> {
    let df = df!("x" => [10.0, 20.0, 30.0], "flat" => [5.0, 5.0, 5.0])?;
    let columns = ["x".to_owned(), "flat".to_owned()];

    let minmax = transformer().scale_numeric(&df, &columns, ScalingMethod::MinMax)?;
    assert_eq!(floats(&minmax, "x_Normalized")?, [0.0, 0.5, 1.0].map(Some));
    assert_eq!(floats(&minmax, "flat_Normalized")?, [0.0, 0.0, 0.0].map(Some));

    let z = transformer().scale_numeric(&df, &columns, ScalingMethod::ZScore)?;
    let scaled = floats(&z, "x_Scaled")?;
    assert_eq!(scaled[1], Some(0.0));
    assert!((scaled[2].unwrap() - 1.224_744_871).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_scaling_rejects_text() -> Result<()> {
    let result = transformer().scale_numeric(&customers()?, &["Churn".to_owned()], ScalingMethod::MinMax);
    assert!(matches!(result, Err(ChurnError::DataProcessing(_))));
    Ok(())
}

#[test]
fn test_apply_all_on_mock_data() -> Result<()> {
    let raw = mock::generate(300, 42)?;
    let mut t = transformer();
    let out = t.apply_all(&raw)?;

    assert_eq!(out.height(), raw.height());
    for column in [
        TENURE_GROUP_COLUMN,
        CHARGES_GROUP_COLUMN,
        TOTAL_SERVICES_COLUMN,
        CLV_COLUMN,
        PROCESSED_AT_COLUMN,
    ] {
        assert!(out.column(column).is_ok(), "missing {column}");
    }
    assert_eq!(out.width(), raw.width() + 5);
    assert_eq!(out.column(TENURE_GROUP_COLUMN)?.null_count(), 0);
    assert!(!t.transformation_log().is_empty());
    Ok(())
}

#[test]
fn test_apply_all_skips_absent_sources() -> Result<()> {
    let df = df!("CustomerID" => ["A", "B"], "Churn" => ["Yes", "No"])?;
    let out = transformer().apply_all(&df)?;
    assert!(out.column(TENURE_GROUP_COLUMN).is_err());
    assert!(out.column(CLV_COLUMN).is_err());
    assert_eq!(floats(&out, TOTAL_SERVICES_COLUMN)?, [Some(0.0), Some(0.0)]);
    Ok(())
}

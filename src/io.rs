//! Reading and writing datasets.
//!
//! Format is chosen from the file extension: `csv`, `parquet`, `json`
//! (array of row objects) and `xlsx`/`xls`/`xlsm`/`ods` for spreadsheets.

use crate::error::{ChurnError, Result, ResultExt as _};
use calamine::{Data, Reader as _, open_workbook_auto};
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

/// Rows scanned when inferring CSV column types.
const CSV_INFER_SCHEMA_ROWS: usize = 10_000;

/// Which worksheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ChurnError::NotFound(path.to_path_buf()))
    }
}

pub fn load_df(path: &Path) -> Result<DataFrame> {
    ensure_exists(path)?;
    match extension(path).as_str() {
        "csv" => read_csv(path),
        "parquet" => read_parquet(path),
        "json" => read_json(path),
        "xlsx" | "xls" | "xlsm" | "ods" => read_excel(path, &SheetSelector::default()),
        ext => Err(ChurnError::Decode(format!("Unsupported file extension: {ext}"))),
    }
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    ensure_exists(path)?;
    LazyCsvReader::new(path)
        .with_infer_schema_length(Some(CSV_INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .finish()
        .and_then(LazyFrame::collect)
        .map_err(|e| ChurnError::Decode(format!("CSV {}: {e}", path.display())))
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    ensure_exists(path)?;
    ParquetReader::new(std::fs::File::open(path)?)
        .finish()
        .map_err(|e| ChurnError::Decode(format!("Parquet {}: {e}", path.display())))
}

pub fn read_json(path: &Path) -> Result<DataFrame> {
    ensure_exists(path)?;
    JsonReader::new(std::fs::File::open(path)?)
        .finish()
        .map_err(|e| ChurnError::Decode(format!("JSON {}: {e}", path.display())))
}

/// Builds a frame from a JSON array of row objects held in memory.
pub fn json_records_to_df(records: &serde_json::Value) -> Result<DataFrame> {
    let bytes = serde_json::to_vec(records)?;
    JsonReader::new(std::io::Cursor::new(bytes))
        .finish()
        .map_err(|e| ChurnError::Decode(format!("JSON records: {e}")))
}

/// Cell type inferred for a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn infer_sheet_column(cells: &[&Data]) -> SheetColumnKind {
    let mut kind: Option<SheetColumnKind> = None;
    for cell in cells {
        let cell_kind = match cell {
            Data::Empty => continue,
            Data::Int(_) => SheetColumnKind::Integer,
            Data::Float(f) if f.fract() == 0.0 => SheetColumnKind::Integer,
            Data::Float(_) => SheetColumnKind::Float,
            Data::Bool(_) => SheetColumnKind::Boolean,
            _ => SheetColumnKind::Text,
        };
        kind = Some(match (kind, cell_kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (
                Some(SheetColumnKind::Integer | SheetColumnKind::Float),
                SheetColumnKind::Integer | SheetColumnKind::Float,
            ) => SheetColumnKind::Float,
            _ => SheetColumnKind::Text,
        });
        if kind == Some(SheetColumnKind::Text) {
            break;
        }
    }
    kind.unwrap_or(SheetColumnKind::Text)
}

fn cell_as_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn sheet_column(name: &str, cells: &[&Data]) -> Series {
    match infer_sheet_column(cells) {
        SheetColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| cell_as_f64(c).map(|v| v as i64))
                .collect();
            Series::new(name.into(), values)
        }
        SheetColumnKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|c| cell_as_f64(c)).collect();
            Series::new(name.into(), values)
        }
        SheetColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), values)
        }
        SheetColumnKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(name.into(), values)
        }
    }
}

/// Reads one worksheet; the first row is the header.
pub fn read_excel(path: &Path, sheet: &SheetSelector) -> Result<DataFrame> {
    ensure_exists(path)?;
    let mut workbook = open_workbook_auto(path)?;

    let range = match sheet {
        SheetSelector::Index(idx) => workbook
            .worksheet_range_at(*idx)
            .ok_or_else(|| ChurnError::Decode(format!("Workbook has no sheet at index {idx}")))??,
        SheetSelector::Name(name) => workbook.worksheet_range(name)?,
    };

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names: Vec<String> = header.iter().map(ToString::to_string).collect();
    let body: Vec<&[Data]> = rows.collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                .collect();
            Column::from(sheet_column(name, &cells))
        })
        .collect::<Vec<_>>();

    DataFrame::new(columns).map_err(|e| ChurnError::Decode(format!("Excel {}: {e}", path.display())))
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("Failed to create CSV file")?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| ChurnError::Export(format!("CSV {}: {e}", path.display())))
}

pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
    ParquetWriter::new(file)
        .finish(df)
        .map(|_| ())
        .map_err(|e| ChurnError::Export(format!("Parquet {}: {e}", path.display())))
}

pub fn write_json(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("Failed to create JSON file")?;
    JsonWriter::new(file)
        .with_json_format(JsonFormat::Json)
        .finish(df)
        .map_err(|e| ChurnError::Export(format!("JSON {}: {e}", path.display())))
}

/// Writes the frame to a single worksheet with a bold header row.
pub fn write_excel(df: &DataFrame, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col_num = u16::try_from(col_idx)
            .map_err(|_| ChurnError::Export("Too many columns for a worksheet".to_owned()))?;
        worksheet.write_string_with_format(0, col_num, column.name().as_str(), &header_format)?;

        let series = column.as_materialized_series();
        let dtype = series.dtype();

        if dtype.is_bool() {
            for (row, value) in series.bool()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_boolean(sheet_row(row)?, col_num, v)?;
                }
            }
        } else if dtype.is_numeric() {
            let as_float = series.cast(&DataType::Float64)?;
            for (row, value) in as_float.f64()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_number(sheet_row(row)?, col_num, v)?;
                }
            }
        } else {
            let as_text = series.cast(&DataType::String)?;
            for (row, value) in as_text.str()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_string(sheet_row(row)?, col_num, v)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Data rows start below the header.
fn sheet_row(row: usize) -> Result<u32> {
    u32::try_from(row + 1).map_err(|_| ChurnError::Export("Too many rows for a worksheet".to_owned()))
}

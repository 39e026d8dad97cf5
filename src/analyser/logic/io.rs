use super::types::LoadOptions;
use crate::error::{CleanError, Result, ResultExt as _};
use calamine::{Data, Reader as _, open_workbook_auto};
use encoding_rs::{UTF_8, WINDOWS_1252};
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

/// Cell values read as missing in text columns.
pub const NULL_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A", "-",
];

const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(CleanError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                ext
            })),
        }
    }
}

/// Reads a CSV or spreadsheet into a frame.
///
/// CSV text is decoded as UTF-8 with a Latin-1 fallback. Spreadsheets use
/// their first sheet. Text cells matching [`NULL_TOKENS`] become missing.
pub fn load_df(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let df = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => read_csv(path, options)?,
        SourceFormat::Spreadsheet => read_spreadsheet(path, options.preview_rows)?,
    };

    let mut df = standardise_nulls(df)?;

    if let Some(names) = &options.column_names {
        df = apply_header_override(&df, names)?;
    }

    tracing::debug!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Decodes raw CSV bytes, retrying once as Latin-1 when they are not valid UTF-8.
///
/// The fallback is windows-1252, the WHATWG decoder behind the `latin1`
/// label. It matches ISO-8859-1 except for bytes `0x80..=0x9F`, which become
/// printable characters such as `€` and `‚` rather than C1 controls.
/// windows-1252 maps every byte, so the `DecodeFailure` branch is unreachable
/// with this decoder and only kept for callers matching on the variant.
pub fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return Ok(text);
    }

    tracing::warn!("Input is not valid UTF-8, retrying with Latin-1");
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(CleanError::DecodeFailure(
            "input is neither valid UTF-8 nor Latin-1".to_owned(),
        ));
    }
    Ok(text)
}

fn read_csv(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = decode_text(&bytes)?;
    let cursor = Cursor::new(text.into_owned().into_bytes());

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(
            options
                .infer_schema_length
                .unwrap_or(DEFAULT_INFER_SCHEMA_LENGTH),
        ))
        .with_n_rows(options.preview_rows)
        .into_reader_with_file_handle(cursor)
        .finish()
        .context("Failed to read CSV")
}

fn read_spreadsheet(path: &Path, preview_rows: Option<usize>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        CleanError::DataProcessing(format!("Workbook has no sheets: {}", path.display()))
    })??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell_to_string(cell)
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Unnamed: {idx}"))
        })
        .collect();

    let mut cells: Vec<Vec<Data>> = vec![Vec::new(); names.len()];
    for row in rows.take(preview_rows.unwrap_or(usize::MAX)) {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).cloned().unwrap_or(Data::Empty));
        }
    }

    let columns = names
        .iter()
        .zip(&cells)
        .map(|(name, values)| spreadsheet_column(name, values).map(Column::from))
        .collect::<Result<Vec<_>>>()?;

    DataFrame::new(columns).context("Failed to assemble spreadsheet frame")
}

/// Builds a typed series from one spreadsheet column: numbers, booleans and
/// dates stay typed when every non-empty cell agrees, anything else is text.
fn spreadsheet_column(name: &str, values: &[Data]) -> Result<Series> {
    let mut present = values.iter().filter(|c| !matches!(c, Data::Empty));

    if present
        .clone()
        .all(|c| matches!(c, Data::Int(_) | Data::Float(_)))
    {
        let nums: Vec<Option<f64>> = values
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), nums));
    }

    if present.clone().all(|c| matches!(c, Data::Bool(_))) {
        let flags: Vec<Option<bool>> = values
            .iter()
            .map(|c| match c {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), flags));
    }

    if present.all(|c| matches!(c, Data::DateTime(_))) {
        let millis: Vec<Option<i64>> = values
            .iter()
            .map(|c| match c {
                Data::DateTime(dt) => dt.as_datetime().map(|d| d.and_utc().timestamp_millis()),
                _ => None,
            })
            .collect();
        let series = Series::new(name.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        return Ok(series);
    }

    let text: Vec<Option<String>> = values.iter().map(cell_to_string).collect();
    Ok(Series::new(name.into(), text))
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
        other => Some(other.to_string()),
    }
}

pub fn is_null_token(value: &str) -> bool {
    value.trim().is_empty() || NULL_TOKENS.contains(&value)
}

/// Replaces missing-value tokens in every text column with real nulls.
pub fn standardise_nulls(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();

    for name in names {
        let series = df.column(name.as_str())?.as_materialized_series();
        if series.dtype() != &DataType::String {
            continue;
        }

        let ca = series.str()?;
        let values: Vec<Option<&str>> = ca
            .into_iter()
            .map(|v| v.filter(|s| !is_null_token(s)))
            .collect();
        let cleaned = Series::new(name.clone(), values);

        if cleaned.null_count() != series.null_count() {
            df.replace(name.as_str(), cleaned)?;
        }
    }

    Ok(df)
}

/// Renames the columns positionally. The override must name every column.
pub fn apply_header_override(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    if names.len() != df.width() {
        return Err(CleanError::Config(format!(
            "Expected {} column names, got {}",
            df.width(),
            names.len()
        )));
    }

    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(names)
        .map(|(column, name)| column.clone().with_name(name.as_str().into()))
        .collect();

    DataFrame::new(columns).context("Invalid column names")
}

/// Writes the frame as Parquet or JSON by extension, CSV otherwise.
pub fn save_df(df: &mut DataFrame, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "parquet" => {
            let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
            ParquetWriter::new(file)
                .finish(df)
                .context("Failed to write Parquet file")?;
        }
        "json" => {
            let file = std::fs::File::create(path).context("Failed to create JSON file")?;
            JsonWriter::new(file)
                .with_json_format(JsonFormat::Json)
                .finish(df)
                .context("Failed to write JSON file")?;
        }
        _ => {
            let file = std::fs::File::create(path).context("Failed to create CSV file")?;
            CsvWriter::new(file)
                .include_header(true)
                .finish(df)
                .context("Failed to write CSV file")?;
        }
    }

    Ok(())
}

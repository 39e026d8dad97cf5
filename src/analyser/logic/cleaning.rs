use super::types::CleaningReport;
use crate::error::Result;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s]").expect("valid special-char pattern"));

/// Drops rows identical across every column, keeping the first occurrence.
/// Surviving rows keep their relative order.
pub fn remove_duplicates(df: &DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
    let text_columns = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series().cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    let views = text_columns
        .iter()
        .map(|s| s.str())
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut seen = HashSet::with_capacity(df.height());
    let mask: BooleanChunked = (0..df.height())
        .map(|row| {
            let key: Vec<Option<&str>> = views.iter().map(|ca| ca.get(row)).collect();
            Some(seen.insert(key))
        })
        .collect();

    let deduped = df.filter(&mask)?;
    let removed = df.height() - deduped.height();
    if removed > 0 {
        debug!("Removed {} duplicate rows", removed);
        report.step(format!("Removed {removed} duplicate rows"));
    }
    Ok(deduped)
}

/// Tukey fence for the observed values, `None` when the fence is not a
/// finite, non-empty interval.
pub fn tukey_fence(values: &Float64Chunked, multiplier: f64) -> Result<Option<(f64, f64)>> {
    let q1 = values.quantile(0.25, QuantileMethod::Linear)?;
    let q3 = values.quantile(0.75, QuantileMethod::Linear)?;
    let (Some(q1), Some(q3)) = (q1, q3) else {
        return Ok(None);
    };

    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;
    Ok((lower.is_finite() && upper.is_finite() && lower <= upper).then_some((lower, upper)))
}

/// Clamps every numeric column into its Tukey fence. Row count is preserved.
pub fn clamp_outliers(
    mut df: DataFrame,
    multiplier: f64,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();

    for name in names {
        let series = df.column(name.as_str())?.as_materialized_series().clone();
        if !series.dtype().is_primitive_numeric() {
            continue;
        }

        let floats = series.cast(&DataType::Float64)?;
        let ca = floats.f64()?;
        let Some((lower, upper)) = tukey_fence(ca, multiplier)? else {
            continue;
        };

        let mut clamped = 0usize;
        let values: Vec<Option<f64>> = ca
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    if x < lower || x > upper {
                        clamped += 1;
                    }
                    x.clamp(lower, upper)
                })
            })
            .collect();

        if clamped > 0 {
            df.replace(name.as_str(), Series::new(name.clone(), values))?;
            report.step(format!(
                "'{name}': clamped {clamped} values into [{lower}, {upper}]"
            ));
        }
    }

    Ok(df)
}

/// Title case where a letter is upper-cased after a non-letter and
/// lower-cased otherwise.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut after_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}

pub fn normalise_value(value: &str, strip_special: bool) -> String {
    let trimmed = value.trim();
    if strip_special {
        let stripped = SPECIAL_CHARS.replace_all(trimmed, "");
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        title_case(&collapsed)
    } else {
        title_case(trimmed)
    }
}

/// Trims and title-cases every text and categorical column.
pub fn normalise_text(
    mut df: DataFrame,
    strip_special: bool,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();

    for name in names {
        let series = df.column(name.as_str())?.as_materialized_series().clone();
        let categorical = matches!(series.dtype(), DataType::Categorical(_, _));
        if !categorical && series.dtype() != &DataType::String {
            continue;
        }

        let text = series.cast(&DataType::String)?;
        let values: Vec<Option<String>> = text
            .str()?
            .into_iter()
            .map(|v| v.map(|s| normalise_value(s, strip_special)))
            .collect();
        let mut normalised = Series::new(name.clone(), values);
        if categorical {
            normalised = normalised.cast(&DataType::Categorical(None, Default::default()))?;
        }

        df.replace(name.as_str(), normalised)?;
        report.step(format!("'{name}': normalised text"));
    }

    Ok(df)
}

/// Turns infinities into missing values and fills every numeric gap with the
/// column median, or `0.0` when the column has no finite value.
pub fn finalise_numeric(mut df: DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();

    for name in names {
        let series = df.column(name.as_str())?.as_materialized_series().clone();
        if !series.dtype().is_primitive_numeric() {
            continue;
        }

        let floats = series.cast(&DataType::Float64)?;
        let finite: Float64Chunked = floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        let missing = finite.null_count();
        if missing == 0 && series.dtype() == &DataType::Float64 {
            continue;
        }

        let median = finite.median().unwrap_or(0.0);
        let values: Vec<Option<f64>> = finite
            .into_iter()
            .map(|v| Some(v.unwrap_or(median)))
            .collect();
        df.replace(name.as_str(), Series::new(name.clone(), values))?;
        if missing > 0 {
            report.step(format!("'{name}': filled {missing} values with median {median}"));
        }
    }

    Ok(df)
}

/// Polars frames carry no row index; rechunking gives the contiguous,
/// zero-based layout a reset index stands for.
pub fn reset_index(mut df: DataFrame) -> DataFrame {
    df.as_single_chunk_par();
    df
}

//! Semantic type inference for text columns.
//!
//! Columns that still hold raw strings after loading are sampled and handed
//! to a [`TypeClassifier`]. The returned label decides how the column is
//! coerced. The classifier may be remote, so every call is bounded by a
//! timeout; a failed or late answer leaves the column as free text.

use super::cleaning::normalise_value;
use super::types::{CleaningReport, ColumnKind, TypeLabel};
use crate::config::CleaningConfig;
use crate::error::{CleanError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static NON_NUMERIC_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("valid numeric-strip pattern"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

const IDENTIFIER_TOKENS: &[&str] = &["id", "code", "key", "sku"];

const CATEGORICAL_MAX_CHARS: usize = 30;
const CATEGORICAL_MAX_WORDS: usize = 3;

/// Decides the semantic type of a column from its name and a few samples.
///
/// Implementations may call out to a remote service; the pipeline bounds each
/// call with a timeout and treats any error as "no classification".
#[async_trait]
pub trait TypeClassifier: Send + Sync {
    /// Returns a free-form label such as `numeric`, `datetime`, `boolean`,
    /// `categorical`, `id`, `code` or `text`.
    async fn classify(&self, column: &str, samples: &[String]) -> Result<String>;
}

/// Offline, deterministic classifier based on value shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

#[async_trait]
impl TypeClassifier for HeuristicClassifier {
    async fn classify(&self, column: &str, samples: &[String]) -> Result<String> {
        Ok(heuristic_label(column, samples).as_str().to_owned())
    }
}

/// Rule order: boolean tokens, numbers, dates, identifier-like name, short
/// labels (categorical), anything else is text.
///
/// The short-label test runs on the text as the normaliser will leave it, so
/// a cleaned column gets the same label on a second pass.
pub fn heuristic_label(column: &str, samples: &[String]) -> TypeLabel {
    let values: Vec<&str> = samples.iter().map(|s| s.trim()).collect();
    if values.is_empty() {
        return TypeLabel::Unknown;
    }

    if values.iter().all(|v| parse_bool_token(v).is_some()) {
        TypeLabel::Boolean
    } else if values.iter().all(|v| looks_numeric(v)) {
        TypeLabel::Numeric
    } else if values.iter().all(|v| parse_datetime(v).is_some()) {
        TypeLabel::Datetime
    } else if is_identifier_name(column) {
        TypeLabel::Id
    } else if values.iter().all(|v| is_short_label(v)) {
        TypeLabel::Categorical
    } else {
        TypeLabel::Text
    }
}

/// `id`, `*_id`, `code`, `key` or `sku` as a separate word of the name.
pub fn is_identifier_name(column: &str) -> bool {
    column
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| IDENTIFIER_TOKENS.contains(&token))
}

fn is_short_label(value: &str) -> bool {
    let normalised = normalise_value(value, true);
    normalised.chars().count() <= CATEGORICAL_MAX_CHARS
        && normalised.split_whitespace().count() <= CATEGORICAL_MAX_WORDS
}

fn looks_numeric(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value.chars().all(|c| {
            c.is_ascii_digit()
                || matches!(c, '.' | '-' | '+' | ',' | '$' | '%' | '€' | '£' | ' ')
        })
        && parse_numeric(value).is_some()
}

/// Strips everything except digits, `.` and `-` and parses the rest.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let stripped = NON_NUMERIC_CHARS.replace_all(value, "");
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_bool_token(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Permissive date/time parser. Slash dates are tried month-first.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Up to `limit` distinct non-missing values, in order of first occurrence.
pub fn sample_values(series: &Series, limit: usize) -> Result<Vec<String>> {
    let text = series.cast(&DataType::String)?;
    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for value in text.str()?.into_iter().flatten() {
        if samples.len() >= limit {
            break;
        }
        if seen.insert(value) {
            samples.push(value.to_owned());
        }
    }
    Ok(samples)
}

/// Converts a text column according to its label. Unparsable cells become missing.
pub fn coerce_column(series: &Series, label: TypeLabel) -> Result<Series> {
    let name = series.name().clone();
    let text = series.cast(&DataType::String)?;
    let ca = text.str()?;

    let coerced = match label {
        TypeLabel::Numeric => {
            let values: Vec<Option<f64>> = ca
                .into_iter()
                .map(|v| v.and_then(parse_numeric))
                .collect();
            Series::new(name, values)
        }
        TypeLabel::Datetime => {
            let millis: Vec<Option<i64>> = ca
                .into_iter()
                .map(|v| v.and_then(parse_datetime).map(|d| d.and_utc().timestamp_millis()))
                .collect();
            Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        TypeLabel::Boolean => {
            let flags: Vec<Option<bool>> = ca
                .into_iter()
                .map(|v| v.and_then(parse_bool_token))
                .collect();
            Series::new(name, flags)
        }
        TypeLabel::Categorical | TypeLabel::Id | TypeLabel::Code => {
            text.cast(&DataType::Categorical(None, Default::default()))?
        }
        TypeLabel::Text | TypeLabel::Unknown => text.clone(),
    };

    Ok(coerced)
}

/// Widens integer columns to `Float64` and turns NaN cells into missing.
/// Returns `None` when the column is already in final numeric form.
pub fn normalise_numeric(series: &Series) -> Result<Option<Series>> {
    if !series.dtype().is_primitive_numeric() {
        return Ok(None);
    }

    let widened = series.cast(&DataType::Float64)?;
    let ca = widened.f64()?;
    let has_nan = ca.into_iter().flatten().any(f64::is_nan);

    if !has_nan {
        return Ok((series.dtype() != &DataType::Float64).then_some(widened.clone()));
    }

    let values: Vec<Option<f64>> = ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
    Ok(Some(Series::new(series.name().clone(), values)))
}

async fn resolve_label(
    classifier: &dyn TypeClassifier,
    column: &str,
    samples: &[String],
    config: &CleaningConfig,
) -> Result<TypeLabel> {
    match tokio::time::timeout(
        config.classifier_timeout(),
        classifier.classify(column, samples),
    )
    .await
    {
        Ok(Ok(raw)) => Ok(TypeLabel::parse(&raw)),
        Ok(Err(e)) => Err(CleanError::ClassificationUnavailable(e.to_string())),
        Err(_) => Err(CleanError::ClassificationUnavailable(format!(
            "no answer within {}s",
            config.classifier_timeout_secs
        ))),
    }
}

/// Classifies every text column and coerces it, normalising typed numeric
/// columns along the way.
pub async fn classify_and_coerce(
    mut df: DataFrame,
    classifier: &dyn TypeClassifier,
    config: &CleaningConfig,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();
    info!("Classifying {} columns", names.len());

    for name in names {
        let series = df.column(name.as_str())?.as_materialized_series().clone();

        if let Some(normalised) = normalise_numeric(&series)? {
            df.replace(name.as_str(), normalised)?;
            continue;
        }
        if series.dtype() != &DataType::String {
            continue;
        }

        let samples = sample_values(&series, config.sample_size)?;
        if samples.is_empty() {
            debug!("'{}' has no samples, leaving it unclassified", name);
            report.step(format!("'{name}': no values to classify"));
            continue;
        }

        let label = match resolve_label(classifier, name.as_str(), &samples, config).await {
            Ok(label) => label,
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                warn!("Classifier failed for '{}', keeping it as text: {}", name, e);
                report.step(format!("'{name}': {e}; kept as text"));
                TypeLabel::Text
            }
        };
        debug!("Classified '{}' as {}", name, label);

        let coerced = coerce_column(&series, label)?;
        let kind = ColumnKind::from_dtype(coerced.dtype());
        if kind != label.target_kind() {
            return Err(CleanError::DataProcessing(format!(
                "'{name}': coercing to {label} produced a {kind} column"
            )));
        }
        df.replace(name.as_str(), coerced)?;
        report.step(format!("'{name}': classified as {label}, stored as {kind}"));
    }

    Ok(df)
}

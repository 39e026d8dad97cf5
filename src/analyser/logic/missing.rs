//! Missing-value resolution.
//!
//! Pass 1 drops every column whose missing ratio is above the column
//! threshold. Pass 2 walks the remaining columns in order and resolves each
//! one with the first matching entry of [`MISSING_VALUE_RULES`]. Row drops
//! shrink the table, so later columns see the reduced row count.

use super::imputers::{KnnImputer, mode, skewness};
use super::types::{CleaningReport, ColumnKind};
use crate::config::MissingValuePolicy;
use crate::error::Result;
use polars::prelude::*;
use tracing::{debug, info, warn};

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImputeAction {
    DropRows,
    FillMean,
    FillMedian,
    JointKnn,
    DropColumn,
    FillMode,
    FillUnknown,
    ForwardBackward,
}

/// What the rule table sees of a column with at least one missing value.
#[derive(Clone, Copy, Debug)]
pub struct ColumnState {
    pub kind: ColumnKind,
    pub missing_ratio: f64,
    pub skewness: Option<f64>,
}

pub struct MissingRule {
    pub name: &'static str,
    pub applies: fn(&ColumnState, &MissingValuePolicy) -> bool,
    pub action: ImputeAction,
}

/// Evaluated top-down; the first rule that applies wins. The last rule
/// matches everything.
pub const MISSING_VALUE_RULES: &[MissingRule] = &[
    MissingRule {
        name: "sparse gaps",
        applies: is_sparse,
        action: ImputeAction::DropRows,
    },
    MissingRule {
        name: "numeric, low missingness, near-symmetric",
        applies: is_numeric_symmetric_low,
        action: ImputeAction::FillMean,
    },
    MissingRule {
        name: "numeric, low missingness, skewed",
        applies: is_numeric_low,
        action: ImputeAction::FillMedian,
    },
    MissingRule {
        name: "numeric, moderate missingness",
        applies: is_numeric_moderate,
        action: ImputeAction::JointKnn,
    },
    MissingRule {
        name: "numeric, heavy missingness",
        applies: is_numeric,
        action: ImputeAction::DropColumn,
    },
    MissingRule {
        name: "categorical/text, moderate missingness",
        applies: is_textual_moderate,
        action: ImputeAction::FillMode,
    },
    MissingRule {
        name: "categorical/text, heavy missingness",
        applies: is_textual,
        action: ImputeAction::FillUnknown,
    },
    MissingRule {
        name: "datetime",
        applies: is_temporal,
        action: ImputeAction::ForwardBackward,
    },
    FALLBACK_RULE,
];

/// Catch-all closing [`MISSING_VALUE_RULES`].
pub const FALLBACK_RULE: MissingRule = MissingRule {
    name: "fallback",
    applies: always,
    action: ImputeAction::FillUnknown,
};

fn is_sparse(s: &ColumnState, p: &MissingValuePolicy) -> bool {
    s.missing_ratio < p.row_drop_below
}

fn is_numeric_symmetric_low(s: &ColumnState, p: &MissingValuePolicy) -> bool {
    is_numeric_low(s, p) && s.skewness.is_some_and(|k| k.abs() < p.skew_limit)
}

fn is_numeric_low(s: &ColumnState, p: &MissingValuePolicy) -> bool {
    s.kind == ColumnKind::Numeric && s.missing_ratio < p.stat_fill_below
}

fn is_numeric_moderate(s: &ColumnState, p: &MissingValuePolicy) -> bool {
    s.kind == ColumnKind::Numeric && s.missing_ratio < p.knn_fill_below
}

fn is_numeric(s: &ColumnState, _p: &MissingValuePolicy) -> bool {
    s.kind == ColumnKind::Numeric
}

fn is_textual_moderate(s: &ColumnState, p: &MissingValuePolicy) -> bool {
    s.kind.is_textual() && s.missing_ratio < p.knn_fill_below
}

fn is_textual(s: &ColumnState, _p: &MissingValuePolicy) -> bool {
    s.kind.is_textual()
}

fn is_temporal(s: &ColumnState, _p: &MissingValuePolicy) -> bool {
    s.kind == ColumnKind::Temporal
}

fn always(_s: &ColumnState, _p: &MissingValuePolicy) -> bool {
    true
}

/// Returns the first rule of [`MISSING_VALUE_RULES`] that applies, or
/// [`FALLBACK_RULE`] when none does.
pub fn choose_rule(state: &ColumnState, policy: &MissingValuePolicy) -> &'static MissingRule {
    MISSING_VALUE_RULES
        .iter()
        .find(|rule| (rule.applies)(state, policy))
        .unwrap_or(&FALLBACK_RULE)
}

pub fn choose_action(state: &ColumnState, policy: &MissingValuePolicy) -> ImputeAction {
    choose_rule(state, policy).action
}

pub fn missing_ratio(missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        missing as f64 / rows as f64
    }
}

/// Runs both passes and returns the resolved frame.
pub fn resolve_missing_values(
    mut df: DataFrame,
    policy: &MissingValuePolicy,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    info!("Resolving missing values");

    let height = df.height();
    let over_threshold: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| missing_ratio(c.null_count(), height) > policy.column_drop_threshold)
        .map(|c| c.name().clone())
        .collect();
    for name in over_threshold {
        df = df.drop(name.as_str())?;
        debug!("Dropped '{}': above the column missing threshold", name);
        report.step(format!(
            "'{name}': dropped, more than {:.0}% missing",
            policy.column_drop_threshold * 100.0
        ));
        report.dropped_columns.push(name.to_string());
    }

    let names: Vec<PlSmallStr> = df.get_column_names().into_iter().cloned().collect();
    let mut knn_done = false;

    for name in names {
        let Ok(column) = df.column(name.as_str()) else {
            continue;
        };
        let series = column.as_materialized_series().clone();
        let missing = series.null_count();
        if missing == 0 {
            continue;
        }

        let kind = ColumnKind::from_dtype(series.dtype());
        let state = ColumnState {
            kind,
            missing_ratio: missing_ratio(missing, df.height()),
            skewness: if kind == ColumnKind::Numeric {
                skewness(&observed_f64(&series)?)
            } else {
                None
            },
        };
        let rule = choose_rule(&state, policy);
        debug!(
            "'{}' ({}, {:.1}% missing): {}",
            name,
            kind,
            state.missing_ratio * 100.0,
            rule.name
        );

        match rule.action {
            ImputeAction::DropRows => {
                let before = df.height();
                df = df.filter(&series.is_not_null())?;
                report.step(format!(
                    "'{name}': dropped {} rows with missing values",
                    before - df.height()
                ));
            }
            ImputeAction::FillMean => {
                let value = series.cast(&DataType::Float64)?.f64()?.mean();
                df.replace(name.as_str(), fill_numeric(&series, value)?)?;
                report.step(format!("'{name}': filled {missing} values with the mean"));
            }
            ImputeAction::FillMedian => {
                let value = series.cast(&DataType::Float64)?.f64()?.median();
                df.replace(name.as_str(), fill_numeric(&series, value)?)?;
                report.step(format!("'{name}': filled {missing} values with the median"));
            }
            ImputeAction::JointKnn => {
                if knn_done {
                    debug!("Joint KNN imputation already ran, nothing left for '{}'", name);
                } else {
                    knn_done = true;
                    joint_knn_imputation(&mut df, policy.knn_neighbors, report)?;
                }
            }
            ImputeAction::DropColumn => {
                df = df.drop(name.as_str())?;
                report.step(format!(
                    "'{name}': dropped, numeric column with {:.0}% missing",
                    state.missing_ratio * 100.0
                ));
                report.dropped_columns.push(name.to_string());
            }
            ImputeAction::FillMode => {
                let text = series.cast(&DataType::String)?;
                let value = mode(text.str()?.into_iter().flatten())
                    .map(str::to_owned)
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_owned());
                df.replace(name.as_str(), fill_text(&series, &value)?)?;
                report.step(format!("'{name}': filled {missing} values with mode '{value}'"));
            }
            ImputeAction::FillUnknown => {
                df.replace(name.as_str(), fill_text(&series, UNKNOWN_LABEL)?)?;
                report.step(format!("'{name}': filled {missing} values with '{UNKNOWN_LABEL}'"));
            }
            ImputeAction::ForwardBackward => match fill_temporal(&series)? {
                Some(filled) => {
                    df.replace(name.as_str(), filled)?;
                    report.step(format!("'{name}': forward/backward filled {missing} values"));
                }
                None => {
                    warn!("'{}' has no timestamps to fill from, dropping it", name);
                    df = df.drop(name.as_str())?;
                    report.step(format!("'{name}': dropped, no timestamps to fill from"));
                    report.dropped_columns.push(name.to_string());
                }
            },
        }
    }

    Ok(df)
}

fn observed_f64(series: &Series) -> Result<Vec<f64>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().flatten().collect())
}

fn fill_numeric(series: &Series, value: Option<f64>) -> Result<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|v| v.or(value))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fills text gaps with `value`. Categorical columns stay categorical; any
/// other dtype (booleans) becomes a categorical label column.
fn fill_text(series: &Series, value: &str) -> Result<Series> {
    let text = series.cast(&DataType::String)?;
    let values: Vec<Option<&str>> = text
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(value)))
        .collect();
    let filled = Series::new(series.name().clone(), values);

    if series.dtype() == &DataType::String {
        Ok(filled)
    } else {
        Ok(filled.cast(&DataType::Categorical(None, Default::default()))?)
    }
}

/// Forward then backward fill, then the modal timestamp. `None` when the
/// column holds no timestamp at all.
fn fill_temporal(series: &Series) -> Result<Option<Series>> {
    let filled = series
        .fill_null(FillNullStrategy::Forward(None))?
        .fill_null(FillNullStrategy::Backward(None))?;
    if filled.null_count() == 0 {
        return Ok(Some(filled));
    }

    let physical = series.cast(&DataType::Int64)?;
    let Some(modal) = mode(physical.i64()?.into_iter().flatten()) else {
        return Ok(None);
    };
    let values: Vec<Option<i64>> = filled
        .cast(&DataType::Int64)?
        .i64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(modal)))
        .collect();
    let series = Series::new(series.name().clone(), values).cast(series.dtype())?;
    Ok(Some(series))
}

/// KNN imputation over every numeric column at once. Runs at most once per
/// resolution pass; an infeasible imputation is logged and skipped.
fn joint_knn_imputation(
    df: &mut DataFrame,
    k: usize,
    report: &mut CleaningReport,
) -> Result<()> {
    let numeric: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_primitive_numeric())
        .map(|c| c.name().clone())
        .collect();

    let mut matrix = numeric
        .iter()
        .map(|name| -> Result<Vec<Option<f64>>> {
            let floats = df
                .column(name.as_str())?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            Ok(floats.f64()?.into_iter().collect())
        })
        .collect::<Result<Vec<_>>>()?;

    let imputer = KnnImputer::new(k);
    match imputer.fit_transform(&mut matrix) {
        Ok(filled) => {
            for (name, values) in numeric.iter().zip(matrix) {
                df.replace(name.as_str(), Series::new(name.clone(), values))?;
            }
            report.step(format!(
                "Joint KNN imputation (k={}) filled {filled} values across {} numeric columns",
                imputer.k(),
                numeric.len()
            ));
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            warn!("Skipping joint KNN imputation: {}", e);
            report.step(format!("Joint KNN imputation skipped: {e}"));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

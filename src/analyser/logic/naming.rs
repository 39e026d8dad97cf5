use super::types::CleaningReport;
use crate::error::{Result, ResultExt as _};
use polars::prelude::*;
use std::collections::HashSet;

/// Canonical form of a column name: lowercase ASCII letters, digits and
/// single underscores, never starting with a digit.
pub fn canonical_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    // Collapse every run of disallowed characters into one underscore
    let mut result = String::with_capacity(lowered.len());
    let mut last_was_underscore = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    let result = result.trim_matches('_');

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        format!("col_{result}")
    } else if result.is_empty() {
        "col".to_owned()
    } else {
        result.to_owned()
    }
}

/// Canonicalises every name, suffixing `_1`, `_2`, ... on collisions.
pub fn canonical_column_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(names.len());

    for name in names {
        let base = canonical_column_name(name);
        let mut candidate = base.clone();
        let mut count = 0;

        while seen.contains(&candidate) {
            count += 1;
            candidate = format!("{base}_{count}");
        }

        seen.insert(candidate.clone());
        cleaned.push(candidate);
    }
    cleaned
}

pub fn canonicalize_columns(df: DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
    let original: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    let renamed = canonical_column_names(&original);

    let changed = original.iter().zip(&renamed).filter(|(a, b)| a != b).count();
    if changed == 0 {
        return Ok(df);
    }

    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .zip(&renamed)
        .map(|(column, name)| column.clone().with_name(name.as_str().into()))
        .collect();
    report.step(format!("Canonicalised {changed} column names"));

    DataFrame::new(columns).context("Failed to rename columns")
}

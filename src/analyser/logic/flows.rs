use super::classify::{TypeClassifier, classify_and_coerce};
use super::cleaning::{clamp_outliers, finalise_numeric, normalise_text, remove_duplicates, reset_index};
use super::io::load_df;
use super::missing::resolve_missing_values;
use super::naming::canonicalize_columns;
use super::types::{CleanedDataset, CleaningReport, ColumnSchema, LoadOptions, derive_schema};
use crate::config::CleaningConfig;
use crate::error::Result;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Runs the fixed cleaning sequence over one dataset:
/// load, classify/coerce, resolve missing values, deduplicate, clamp
/// outliers, normalise text, finalise numerics, canonicalise names.
///
/// The pipeline owns nothing mutable between runs, so one instance can serve
/// many datasets concurrently.
#[derive(Clone)]
pub struct CleaningPipeline {
    classifier: Arc<dyn TypeClassifier>,
    config: CleaningConfig,
    column_names: Option<Vec<String>>,
}

impl CleaningPipeline {
    pub fn new(classifier: Arc<dyn TypeClassifier>) -> Self {
        Self {
            classifier,
            config: CleaningConfig::default(),
            column_names: None,
        }
    }

    pub fn with_config(mut self, config: CleaningConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the file's header positionally.
    pub fn with_column_names(mut self, names: Vec<String>) -> Self {
        self.column_names = Some(names);
        self
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn run(&self, path: &Path) -> Result<CleanedDataset> {
        let start = Instant::now();
        self.config.validate()?;

        let options = LoadOptions {
            preview_rows: None,
            column_names: self.column_names.clone(),
            infer_schema_length: Some(self.config.infer_schema_length),
        };
        let df = load_df(path, &options)?;

        let dataset = self.clean_df(df).await?;
        info!(
            "Cleaned {} in {:.2}s: {} x {} -> {} x {}",
            path.display(),
            start.elapsed().as_secs_f64(),
            dataset.report.rows_in,
            dataset.report.columns_in,
            dataset.report.rows_out,
            dataset.report.columns_out
        );
        Ok(dataset)
    }

    /// Runs every stage after loading on an in-memory frame.
    pub async fn clean_df(&self, df: DataFrame) -> Result<CleanedDataset> {
        let mut report = CleaningReport {
            rows_in: df.height(),
            columns_in: df.width(),
            ..Default::default()
        };

        let df = classify_and_coerce(df, self.classifier.as_ref(), &self.config, &mut report)
            .await?;
        let df = resolve_missing_values(df, &self.config.missing, &mut report)?;
        let df = remove_duplicates(&df, &mut report)?;
        let df = clamp_outliers(df, self.config.iqr_multiplier, &mut report)?;
        let df = normalise_text(df, self.config.strip_special_chars, &mut report)?;
        let df = finalise_numeric(df, &mut report)?;
        let df = canonicalize_columns(df, &mut report)?;
        let df = reset_index(df);

        report.rows_out = df.height();
        report.columns_out = df.width();
        let schema = derive_schema(&df);

        Ok(CleanedDataset { df, schema, report })
    }
}

/// `{name, type}` pairs of the first `rows` rows, without any cleaning.
pub fn preview_schema(path: &Path, rows: usize) -> Result<Vec<ColumnSchema>> {
    let options = LoadOptions {
        preview_rows: Some(rows),
        ..Default::default()
    };
    let df = load_df(path, &options)?;
    Ok(derive_schema(&df))
}

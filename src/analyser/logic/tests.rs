#![expect(clippy::unwrap_used, clippy::indexing_slicing)]

mod flows;
mod io;

use super::*;
use crate::error::{CleanError, Result};
use async_trait::async_trait;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Answers from a fixed column -> label table; other columns get `text`.
struct StubClassifier {
    labels: HashMap<&'static str, &'static str>,
}

impl StubClassifier {
    fn new(labels: &[(&'static str, &'static str)]) -> Self {
        Self {
            labels: labels.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl TypeClassifier for StubClassifier {
    async fn classify(&self, column: &str, _samples: &[String]) -> Result<String> {
        Ok(self.labels.get(column).copied().unwrap_or("text").to_owned())
    }
}

struct FailingClassifier;

#[async_trait]
impl TypeClassifier for FailingClassifier {
    async fn classify(&self, _column: &str, _samples: &[String]) -> Result<String> {
        Err(CleanError::ClassificationUnavailable(
            "service unreachable".to_owned(),
        ))
    }
}

struct SlowClassifier;

#[async_trait]
impl TypeClassifier for SlowClassifier {
    async fn classify(&self, _column: &str, _samples: &[String]) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("numeric".to_owned())
    }
}

/// Writes `contents` to a per-process temp file and returns its path.
fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("autoviz_{}_{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn strings(column: &Column) -> Vec<Option<String>> {
    let text = column
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap();
    text.str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect()
}

fn floats(column: &Column) -> Vec<Option<f64>> {
    let values = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap();
    values.f64().unwrap().into_iter().collect()
}

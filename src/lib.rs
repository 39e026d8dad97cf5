//! # AutoViz - Automated Tabular Data Cleaning
//!
//! AutoViz turns a raw CSV or spreadsheet into an analysis-ready table. It
//! infers a semantic type for each column, resolves missing values with an
//! explicit rule table, removes duplicate rows, clamps outliers, tidies text
//! and canonicalises column names. The cleaned table comes with a
//! `{name, type}` schema for downstream visualisation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use autoviz::analyser::logic::{CleaningPipeline, HeuristicClassifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> autoviz::error::Result<()> {
//! let pipeline = CleaningPipeline::new(Arc::new(HeuristicClassifier));
//! let cleaned = pipeline.run("sales.csv".as_ref()).await?;
//!
//! println!("{} rows after cleaning", cleaned.df.height());
//! for column in &cleaned.schema {
//!     println!("{}: {}", column.name, column.kind);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`analyser::logic`]: loading, classification and every cleaning stage
//! - [`ai`]: language-model column classifier
//! - [`config`]: thresholds and settings, loaded from JSON
//! - [`error`]: error types and handling utilities
//! - [`logging`]: console and rolling-file tracing setup
//!
//! ## Classification
//!
//! Columns that load as raw strings are typed by a [`TypeClassifier`]. The
//! offline [`HeuristicClassifier`] is deterministic; [`ai::LlmClassifier`]
//! asks a chat model. Every call is bounded by a timeout, and a failed call
//! leaves the column as free text instead of failing the run.
//!
//! [`TypeClassifier`]: analyser::logic::TypeClassifier
//! [`HeuristicClassifier`]: analyser::logic::HeuristicClassifier

#![warn(clippy::all, rust_2018_idioms)]

pub mod ai;
pub mod analyser;
pub mod config;
pub mod error;
pub mod logging;

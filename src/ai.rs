//! Language-model integration.
//!
//! Holds the chat-completion client used as the remote column classifier.

#![allow(clippy::module_name_repetitions)]

pub mod client;

pub use client::LlmClassifier;

pub mod classify;
pub mod cleaning;
pub mod flows;
pub mod imputers;
pub mod io;
pub mod missing;
pub mod naming;
pub mod types;

pub use classify::{HeuristicClassifier, TypeClassifier, classify_and_coerce};
pub use cleaning::{clamp_outliers, finalise_numeric, normalise_text, remove_duplicates};
pub use flows::{CleaningPipeline, preview_schema};
pub use io::{load_df, save_df};
pub use missing::{ImputeAction, MISSING_VALUE_RULES, choose_action, resolve_missing_values};
pub use naming::{canonical_column_name, canonicalize_columns};
pub use types::{
    CleanedDataset, CleaningReport, ColumnKind, ColumnSchema, LoadOptions, TypeLabel,
    derive_schema,
};

#[cfg(test)]
mod tests;

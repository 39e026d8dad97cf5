use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_MISSING_THRESHOLD: &str = "AUTOVIZ_MISSING_THRESHOLD";
pub const ENV_CLASSIFIER_TIMEOUT: &str = "AUTOVIZ_CLASSIFIER_TIMEOUT_SECS";

/// Thresholds driving the missing-value rule table.
///
/// The column threshold (pass 1) and the numeric drop threshold
/// (`knn_fill_below`, pass 2) are evaluated independently: a numeric column
/// at 45% missing survives triage and is still dropped in pass 2.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MissingValuePolicy {
    /// Drop any column whose missing ratio is strictly above this value
    pub column_drop_threshold: f64,
    /// Below this ratio the rows missing the column are dropped
    pub row_drop_below: f64,
    /// Numeric columns below this ratio get a mean/median fill
    pub stat_fill_below: f64,
    /// Numeric columns below this ratio get joint KNN imputation, at or above it they are dropped.
    /// Categorical/text columns below it get a mode fill, at or above it `"Unknown"`.
    pub knn_fill_below: f64,
    /// `|skewness|` below this uses the mean, otherwise the median
    pub skew_limit: f64,
    pub knn_neighbors: usize,
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self {
            column_drop_threshold: 0.5,
            row_drop_below: 0.05,
            stat_fill_below: 0.2,
            knn_fill_below: 0.4,
            skew_limit: 1.0,
            knn_neighbors: 3,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AIConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Optional OpenAI-compatible endpoint; the public API when empty
    pub api_base: String,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.0,
            max_tokens: 16,
            api_base: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CleaningConfig {
    pub missing: MissingValuePolicy,
    /// Tukey fence multiplier
    pub iqr_multiplier: f64,
    /// Distinct non-missing values handed to the classifier per column
    pub sample_size: usize,
    pub classifier_timeout_secs: u64,
    /// Remove characters outside `[A-Za-z0-9\s]` from text columns
    pub strip_special_chars: bool,
    /// Rows used by the CSV reader to infer column dtypes
    pub infer_schema_length: usize,
    /// Rows read by the schema preview
    pub preview_rows: usize,
    pub ai: AIConfig,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing: MissingValuePolicy::default(),
            iqr_multiplier: 1.5,
            sample_size: 10,
            classifier_timeout_secs: 30,
            strip_special_chars: true,
            infer_schema_length: 10_000,
            preview_rows: 5,
            ai: AIConfig::default(),
        }
    }
}

impl CleaningConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    /// Checks that every ratio lies in `[0, 1]` and the rule thresholds are ordered.
    pub fn validate(&self) -> Result<()> {
        let m = &self.missing;
        let ratios = [
            ("column_drop_threshold", m.column_drop_threshold),
            ("row_drop_below", m.row_drop_below),
            ("stat_fill_below", m.stat_fill_below),
            ("knn_fill_below", m.knn_fill_below),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(CleanError::Config(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if !(m.row_drop_below <= m.stat_fill_below && m.stat_fill_below <= m.knn_fill_below) {
            return Err(CleanError::Config(
                "missing-value thresholds must satisfy row_drop_below <= stat_fill_below <= knn_fill_below"
                    .to_owned(),
            ));
        }
        if m.knn_neighbors == 0 {
            return Err(CleanError::Config("knn_neighbors must be at least 1".to_owned()));
        }
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(CleanError::Config(format!(
                "iqr_multiplier must be a non-negative number, got {}",
                self.iqr_multiplier
            )));
        }
        if self.sample_size == 0 {
            return Err(CleanError::Config("sample_size must be at least 1".to_owned()));
        }
        Ok(())
    }

    /// Applies `AUTOVIZ_*` environment overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(ENV_MISSING_THRESHOLD)
            && let Ok(parsed) = val.parse::<f64>()
        {
            self.missing.column_drop_threshold = parsed;
        }
        if let Ok(val) = std::env::var(ENV_CLASSIFIER_TIMEOUT)
            && let Ok(parsed) = val.parse::<u64>()
        {
            self.classifier_timeout_secs = parsed;
        }
    }
}

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("autoviz").join("config.json"))
}

pub fn load_config_from(path: &Path) -> Result<CleaningConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = serde_json::from_str::<CleaningConfig>(&content)?;
    Ok(config)
}

/// Loads the configuration from `explicit`, else from the default config
/// path when it exists, else defaults; then applies env overrides and validates.
pub fn load_config(explicit: Option<&Path>) -> Result<CleaningConfig> {
    let mut config = match explicit {
        Some(path) => load_config_from(path)?,
        None => match get_config_path() {
            Some(path) if path.exists() => load_config_from(&path)?,
            _ => CleaningConfig::default(),
        },
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

pub fn save_config(config: &CleaningConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CleaningConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.missing.column_drop_threshold, 0.5);
        assert_eq!(config.missing.knn_neighbors, 3);
        assert_eq!(config.sample_size, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CleaningConfig =
            serde_json::from_str(r#"{"missing": {"column_drop_threshold": 0.7}}"#).unwrap();
        assert_eq!(config.missing.column_drop_threshold, 0.7);
        assert_eq!(config.missing.row_drop_below, 0.05);
        assert_eq!(config.iqr_multiplier, 1.5);
    }

    #[test]
    fn test_validate_rejects_out_of_range_ratio() {
        let mut config = CleaningConfig::default();
        config.missing.column_drop_threshold = 1.5;
        assert!(matches!(config.validate(), Err(CleanError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_neighbors() {
        let mut config = CleaningConfig::default();
        config.missing.knn_neighbors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir().join("autoviz_test_config.json");
        let mut config = CleaningConfig::default();
        config.strip_special_chars = false;
        save_config(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(path);
    }
}

//! Centralized error handling for the cleaning pipeline.
//!
//! Every stage returns [`Result<T>`], an alias over [`CleanError`]. The
//! variants mirror how the pipeline reacts to a failure:
//!
//! - [`CleanError::UnsupportedFormat`] and [`CleanError::DecodeFailure`] abort
//!   the run from the loader.
//! - [`CleanError::ClassificationUnavailable`] is produced when the type
//!   classifier fails or times out. The orchestrator recovers from it locally
//!   by keeping the column as free text.
//! - [`CleanError::ImputationInfeasible`] is produced by joint KNN imputation
//!   and treated as a no-op by the missing-value resolver.
//! - Everything else propagates and aborts the run. No partially cleaned
//!   table is ever returned.
//!
//! ```
//! use autoviz::error::CleanError;
//!
//! let err = CleanError::ClassificationUnavailable("timed out".to_owned());
//! assert!(err.is_recoverable());
//! ```
//!
//! The [`ResultExt`] trait adds `.context()` to any result whose error
//! converts into [`CleanError`]. The variant survives, only the message
//! grows:
//!
//! ```no_run
//! use autoviz::error::ResultExt as _;
//!
//! fn read_upload(path: &str) -> autoviz::error::Result<Vec<u8>> {
//!     std::fs::read(path).context("Failed to read upload")
//! }
//! ```

use std::fmt;

/// Main error type for cleaning operations.
#[derive(Debug)]
pub enum CleanError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// The file extension is not a delimited-text or spreadsheet format
    UnsupportedFormat(String),

    /// The file could not be decoded as UTF-8 nor as Latin-1
    DecodeFailure(String),

    /// The type classifier failed or timed out
    ClassificationUnavailable(String),

    /// Joint KNN imputation could not run
    ImputationInfeasible(String),

    /// Data processing errors (Polars, spreadsheet parsing, invariants)
    DataProcessing(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported file format: {ext}"),
            Self::DecodeFailure(msg) => write!(f, "Failed to decode file: {msg}"),
            Self::ClassificationUnavailable(msg) => {
                write!(f, "Type classification unavailable: {msg}")
            }
            Self::ImputationInfeasible(msg) => write!(f, "Imputation infeasible: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CleanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CleanError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for CleanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for CleanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for CleanError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<calamine::Error> for CleanError {
    fn from(err: calamine::Error) -> Self {
        Self::DataProcessing(format!("Spreadsheet error: {err}"))
    }
}

impl From<async_openai::error::OpenAIError> for CleanError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::ClassificationUnavailable(err.to_string())
    }
}

impl CleanError {
    /// Prefixes the message while keeping the variant, so callers can still
    /// tell a recoverable failure from an abort after context is added.
    /// I/O errors become [`CleanError::Other`] since they carry no message.
    pub fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::UnsupportedFormat(msg) => Self::UnsupportedFormat(format!("{prefix}: {msg}")),
            Self::DecodeFailure(msg) => Self::DecodeFailure(format!("{prefix}: {msg}")),
            Self::ClassificationUnavailable(msg) => {
                Self::ClassificationUnavailable(format!("{prefix}: {msg}"))
            }
            Self::ImputationInfeasible(msg) => {
                Self::ImputationInfeasible(format!("{prefix}: {msg}"))
            }
            Self::DataProcessing(msg) => Self::DataProcessing(format!("{prefix}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{prefix}: {msg}")),
            other @ (Self::Io(_) | Self::Other(_)) => Self::Other(format!("{prefix}: {other}")),
        }
    }

    /// Whether the pipeline carries on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ClassificationUnavailable(_) | Self::ImputationInfeasible(_)
        )
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Adds a message prefix to any result whose error converts into
/// [`CleanError`], keeping the variant.
pub trait ResultExt<T> {
    fn context(self, msg: &str) -> Result<T>;

    /// Lazy variant of [`ResultExt::context`].
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CleanError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(msg))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CleanError::UnsupportedFormat("pdf".to_owned());
        assert_eq!(err.to_string(), "Unsupported file format: pdf");
    }

    #[test]
    fn test_context_keeps_variant() {
        let result: Result<()> = Err(CleanError::DecodeFailure("invalid byte 0xff".to_owned()));
        let err = result.context("Failed to load upload.csv").unwrap_err();
        assert!(matches!(err, CleanError::DecodeFailure(_)));
        assert_eq!(
            err.to_string(),
            "Failed to decode file: Failed to load upload.csv: invalid byte 0xff"
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_recoverable_variants() {
        assert!(CleanError::ClassificationUnavailable("timeout".to_owned()).is_recoverable());
        assert!(CleanError::ImputationInfeasible("no rows".to_owned()).is_recoverable());
        assert!(!CleanError::Config("bad".to_owned()).is_recoverable());
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "upload.csv",
        ));

        let result: Result<()> = result.context("Failed to read upload");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read upload")
        );
    }

    #[test]
    fn test_polars_error_maps_to_data_processing() {
        let err: CleanError =
            polars::error::PolarsError::ComputeError("bad cast".into()).into();
        assert!(matches!(err, CleanError::DataProcessing(_)));
    }
}

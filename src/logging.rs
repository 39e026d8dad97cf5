//! Logging setup for the cleaning pipeline.
//!
//! The library only emits `tracing` events: `info!` per stage, `debug!` per
//! column decision and `warn!` when a step is skipped or a classifier answer
//! is discarded. Binaries call [`init`] once to route them to stderr and,
//! unless disabled, to daily-rotating files.
//!
//! ```no_run
//! use autoviz::logging::{self, LogOptions};
//!
//! logging::init(&LogOptions::default()).expect("Failed to initialize logging");
//! tracing::info!("Cleaning started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Overrides the platform log directory.
pub const ENV_LOG_DIR: &str = "AUTOVIZ_LOG_DIR";

const LOG_PREFIX: &str = "autoviz";
const WARN_PREFIX: &str = "warnings";
const RETAINED_FILES: usize = 7;

#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `autoviz=debug`.
    pub default_filter: String,
    /// Write rolling log files in addition to stderr.
    pub to_files: bool,
    /// Explicit log directory; see [`log_dir`] for the fallback chain.
    pub dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_owned(),
            to_files: true,
            dir: None,
        }
    }
}

impl LogOptions {
    /// `debug` for this crate when `verbose`, `info` otherwise.
    pub fn verbosity(verbose: bool) -> Self {
        let default_filter = if verbose { "info,autoviz=debug" } else { "info" };
        Self {
            default_filter: default_filter.to_owned(),
            ..Self::default()
        }
    }
}

/// Resolves the log directory: the explicit option, then `AUTOVIZ_LOG_DIR`,
/// then `<data dir>/autoviz/logs`
/// (`~/.local/share` on Linux, `~/Library/Application Support` on macOS,
/// `%APPDATA%` on Windows).
pub fn log_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(ENV_LOG_DIR).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("autoviz").join("logs"))
}

fn rolling_appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(RETAINED_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to create {prefix} log appender in {}", dir.display()))
}

/// Installs the global subscriber.
///
/// Stderr always gets events passing the filter (`RUST_LOG`, else
/// [`LogOptions::default_filter`]). With file output, `autoviz.<date>.log`
/// mirrors stderr and `warnings.<date>.log` keeps warnings and errors only,
/// which is where skipped imputations and classifier fallbacks end up.
///
/// # Errors
///
/// Fails when the filter does not parse or the log directory cannot be
/// created. Nothing is installed in that case.
pub fn init(options: &LogOptions) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let (file_layers, dir) = if options.to_files {
        let dir = log_dir(options.dir.as_deref())?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

        let all_layer = fmt::layer()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(rolling_appender(&dir, LOG_PREFIX)?);
        let warn_layer = fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(rolling_appender(&dir, WARN_PREFIX)?)
            .with_filter(EnvFilter::new("warn"));

        (Some(all_layer.and_then(warn_layer)), Some(dir))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layers)
        .init();

    match dir {
        Some(dir) => tracing::debug!("Logging initialized, log directory: {}", dir.display()),
        None => tracing::debug!("Logging initialized, file output disabled"),
    }
    Ok(())
}

/// Today's main log file inside `dir`.
pub fn current_log_path(dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    dir.join(format!("{LOG_PREFIX}.{today}.log"))
}

//! # AutoViz command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialise logging (stderr + rolling files)
//!   └─> Run the command on a Tokio runtime
//! ```
//!
//! ```bash
//! autoviz clean sales.csv --output sales_clean.parquet
//! autoviz schema sales.csv --rows 5
//! autoviz init-config
//! ```
//!
//! Pass `--verbose` (or set `RUST_LOG=autoviz=debug`) to see every cleaning
//! decision.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Console output still works if the log directory is unavailable
    let log_options = cli.log_options();
    if let Err(e) = autoviz::logging::init(&log_options) {
        eprintln!("Failed to initialise logging: {e:#}");
    }

    let result = tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command));
    if let Err(e) = &result {
        tracing::error!("{e:#}");
        if log_options.to_files
            && let Ok(dir) = autoviz::logging::log_dir(log_options.dir.as_deref())
        {
            eprintln!(
                "Details in {}",
                autoviz::logging::current_log_path(&dir).display()
            );
        }
    }
    result
}

use anyhow::{Context as _, Result};
use autoviz::ai::LlmClassifier;
use autoviz::ai::client::API_KEY_ENV;
use autoviz::analyser::logic::{
    CleaningPipeline, HeuristicClassifier, TypeClassifier, preview_schema, save_df,
};
use autoviz::config::{CleaningConfig, get_config_path, load_config, save_config};
use autoviz::logging::{ENV_LOG_DIR, LogOptions};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "autoviz", about = "Automated cleaning for tabular datasets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log every per-column decision
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for rolling log files
    #[arg(long, global = true, env = ENV_LOG_DIR)]
    pub log_dir: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long, global = true)]
    pub no_log_files: bool,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            to_files: !self.no_log_files,
            dir: self.log_dir.clone(),
            ..LogOptions::verbosity(self.verbose)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ClassifierChoice {
    /// Offline rules based on value shapes
    #[default]
    Heuristic,
    /// Chat model via an OpenAI-compatible API (needs OPENAI_API_KEY)
    Llm,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a CSV or spreadsheet and save the result
    Clean {
        /// Input file path (CSV, XLSX, XLS, XLSM, ODS)
        file: PathBuf,

        /// Output file path; CSV unless the extension is .parquet or .json.
        /// Defaults to `<stem>_cleaned.csv` next to the input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a JSON cleaning configuration file
        #[arg(long, env = "AUTOVIZ_CONFIG")]
        config: Option<PathBuf>,

        /// Column type classifier
        #[arg(long, value_enum, default_value_t)]
        classifier: ClassifierChoice,

        /// API key for the LLM classifier
        #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
        api_key: Option<String>,

        /// Replacement header, one comma-separated name per column
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Print the cleaning report as JSON
        #[arg(long)]
        report: bool,
    },
    /// Print the `{name, type}` schema of the first rows of a file
    Schema {
        /// Input file path
        file: PathBuf,

        /// Number of rows to read. Defaults to the configured preview size.
        #[arg(short, long)]
        rows: Option<usize>,

        /// Path to a JSON cleaning configuration file
        #[arg(long, env = "AUTOVIZ_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Write the default configuration to disk
    InitConfig {
        /// Destination. Defaults to the platform config directory.
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Clean {
            file,
            output,
            config,
            classifier,
            api_key,
            columns,
            report,
        } => {
            let config = load_config(config.as_deref()).context("Failed to load configuration")?;
            let classifier = build_classifier(classifier, api_key, &config)?;
            handle_clean(file, output, config, classifier, columns, report).await
        }
        Commands::Schema { file, rows, config } => handle_schema(&file, rows, config),
        Commands::InitConfig { path, force } => handle_init_config(path, force),
    }
}

fn build_classifier(
    choice: ClassifierChoice,
    api_key: Option<String>,
    config: &CleaningConfig,
) -> Result<Arc<dyn TypeClassifier>> {
    let classifier: Arc<dyn TypeClassifier> = match (choice, api_key) {
        (ClassifierChoice::Heuristic, _) => Arc::new(HeuristicClassifier),
        (ClassifierChoice::Llm, Some(key)) => Arc::new(LlmClassifier::new(key, config.ai.clone())),
        (ClassifierChoice::Llm, None) => Arc::new(
            LlmClassifier::from_env(config.ai.clone())
                .context("Failed to set up the LLM classifier")?,
        ),
    };
    Ok(classifier)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}_cleaned.csv"))
}

async fn handle_clean(
    file: PathBuf,
    output: Option<PathBuf>,
    config: CleaningConfig,
    classifier: Arc<dyn TypeClassifier>,
    columns: Option<Vec<String>>,
    print_report: bool,
) -> Result<()> {
    let output = output.unwrap_or_else(|| default_output_path(&file));

    println!(
        "Cleaning {0} and saving to {1}...",
        file.display(),
        output.display()
    );

    let mut pipeline = CleaningPipeline::new(classifier).with_config(config);
    if let Some(names) = columns {
        pipeline = pipeline.with_column_names(names);
    }

    let mut cleaned = pipeline.run(&file).await.context("Cleaning failed")?;
    save_df(&mut cleaned.df, &output).context("Failed to save cleaned file")?;

    println!(
        "Successfully cleaned: {} rows x {} columns ({} columns dropped).",
        cleaned.report.rows_out,
        cleaned.report.columns_out,
        cleaned.report.dropped_columns.len()
    );
    for column in &cleaned.schema {
        println!("  {:<30} {}", column.name, column.kind);
    }

    if print_report {
        println!("{}", serde_json::to_string_pretty(&cleaned.report)?);
    }
    Ok(())
}

fn handle_schema(file: &Path, rows: Option<usize>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    let schema = preview_schema(file, rows.unwrap_or(config.preview_rows))
        .context("Failed to read schema")?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn handle_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => get_config_path().context("Failed to determine config directory")?,
    };

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    save_config(&CleaningConfig::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_output_sits_next_to_input() {
        let out = default_output_path(Path::new("/data/sales.xlsx"));
        assert_eq!(out, PathBuf::from("/data/sales_cleaned.csv"));
    }

    #[test]
    fn test_columns_split_on_commas() {
        let cli = Cli::parse_from(["autoviz", "clean", "in.csv", "--columns", "a,b,c"]);
        match cli.command {
            Commands::Clean { columns, .. } => {
                assert_eq!(
                    columns,
                    Some(vec!["a".to_owned(), "b".to_owned(), "c".to_owned()])
                );
            }
            _ => panic!("expected the clean command"),
        }
    }

    #[test]
    fn test_global_logging_flags() {
        let cli = Cli::parse_from(["autoviz", "schema", "in.csv", "-v", "--no-log-files"]);
        let options = cli.log_options();
        assert!(!options.to_files);
        assert_eq!(options.default_filter, "info,autoviz=debug");
    }

    #[test]
    fn test_explicit_api_key_builds_llm_classifier() {
        let classifier = build_classifier(
            ClassifierChoice::Llm,
            Some("sk-test".to_owned()),
            &CleaningConfig::default(),
        );
        assert!(classifier.is_ok());
    }
}

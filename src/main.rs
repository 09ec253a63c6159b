use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etl_pipeline::config::Config;
use etl_pipeline::logging;
use etl_pipeline::pipeline::{Ingestor, Publisher, Transformer};
use etl_pipeline::verify::{intermediate_dir_for_root, run_verification};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "etl_pipeline")]
#[command(about = "Batch CSV -> JSON ETL pipeline with content-hash idempotency")]
#[command(version)]
struct Cli {
    /// Directory scanned for source CSV files
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Directory holding intermediate artifacts and the ledger
    #[arg(long, global = true)]
    intermediate_dir: Option<PathBuf>,

    /// Directory holding transformed/published artifacts
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Optional TOML config file (falls back to ETL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new CSV files into intermediate JSON artifacts
    Ingest,
    /// Consolidate intermediate artifacts into one transformed artifact
    Transform,
    /// Publish the most recent transformed artifact
    Publish,
    /// Check intermediate artifacts against the stored reference hashes
    Verify {
        /// Project root; checks <root>/data/intermediate instead of --intermediate-dir
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Run ingest, transform and publish sequentially
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = config.tracing_level().unwrap_or("info");
    let _guard = logging::init_logging(level, config.log_dir.as_deref());

    match execute(cli.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = &cli.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.intermediate_dir {
        config.intermediate_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

/// Returns whether the command succeeded by its exit-code convention.
fn execute(command: Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Ingest => {
            ingest(config);
            Ok(true)
        }
        Commands::Transform => {
            transform(config);
            Ok(true)
        }
        Commands::Publish => Ok(publish(config)),
        Commands::Verify { root } => {
            let dir = root
                .as_deref()
                .map(intermediate_dir_for_root)
                .unwrap_or_else(|| config.intermediate_dir.clone());
            verify(&dir)
        }
        Commands::Run => {
            info!("Running full pipeline");
            ingest(config);
            transform(config);
            Ok(publish(config))
        }
    }
}

// Ingest and transform never fail the process; problems are logged.
fn ingest(config: &Config) {
    let result = Ingestor::new(config).and_then(|mut ingestor| ingestor.ingest());
    if let Err(e) = result {
        error!("Ingestion aborted: {}", e);
    }
}

fn transform(config: &Config) {
    let result = Transformer::new(config).and_then(|transformer| transformer.transform());
    if let Err(e) = result {
        error!("Transformation aborted: {}", e);
    }
}

fn publish(config: &Config) -> bool {
    Publisher::new(config).publish()
}

fn verify(dir: &std::path::Path) -> Result<bool> {
    let outcome = run_verification(dir)
        .with_context(|| format!("Failed to verify {}", dir.display()))?;
    Ok(outcome.report()?)
}

use anyhow::{Context, Result};
use clap::Parser;
use etl_pipeline::constants::DEFAULT_INTERMEDIATE_DIR;
use etl_pipeline::logging;
use etl_pipeline::verify::{intermediate_dir_for_root, run_verification};
use std::path::PathBuf;

/// Verify intermediate artifacts against stored reference hashes.
#[derive(Parser, Debug)]
#[command(
    name = "verify-reproducibility",
    version,
    about = "Compare intermediate artifact hashes against .reference_hashes.json"
)]
struct Cli {
    /// Project root; the intermediate directory is <root>/data/intermediate
    #[arg(long)]
    root: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let _guard = logging::init_logging("info", None);

    let dir = args
        .root
        .as_deref()
        .map(intermediate_dir_for_root)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERMEDIATE_DIR));

    let outcome = run_verification(&dir)
        .with_context(|| format!("Failed to verify {}", dir.display()))?;

    if !outcome.report()? {
        std::process::exit(1)
    }
    Ok(())
}

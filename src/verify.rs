//! Reproducibility check for intermediate artifacts.
//!
//! The first run snapshots a name -> SHA-256 mapping of every intermediate
//! artifact into `.reference_hashes.json`; later runs compare against it.

use crate::constants::REFERENCE_FILE;
use crate::error::Result;
use crate::hashing::file_sha256;
use crate::storage::{atomic_write, file_name, list_files_with_extension};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub type HashMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// No reference existed; the current mapping was stored as the new one.
    BaselineCreated { path: PathBuf },
    Match,
    Mismatch {
        current: HashMapping,
        reference: HashMapping,
    },
}

impl VerificationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, VerificationOutcome::Mismatch { .. })
    }

    /// Human-readable summary; a mismatch prints both mappings.
    pub fn render(&self) -> Result<String> {
        Ok(match self {
            VerificationOutcome::BaselineCreated { path } => {
                format!("Reference hashes created at {}", path.display())
            }
            VerificationOutcome::Match => "Reproducibility verified".to_string(),
            VerificationOutcome::Mismatch { current, reference } => format!(
                "Hash mismatch detected\nCurrent:   {}\nReference: {}",
                serde_json::to_string_pretty(current)?,
                serde_json::to_string_pretty(reference)?
            ),
        })
    }

    /// Prints the summary (stderr on mismatch) and returns whether it passed.
    pub fn report(&self) -> Result<bool> {
        let text = self.render()?;
        if self.is_failure() {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
        Ok(!self.is_failure())
    }
}

/// `<root>/data/intermediate`
pub fn intermediate_dir_for_root(root: &Path) -> PathBuf {
    root.join("data").join("intermediate")
}

/// Hashes of the non-hidden `*.json` artifacts in `dir`, keyed by file name.
pub fn intermediate_hashes(dir: &Path) -> Result<HashMapping> {
    let mut hashes = HashMapping::new();
    for path in list_files_with_extension(dir, "json")? {
        hashes.insert(file_name(&path), file_sha256(&path)?);
    }
    Ok(hashes)
}

#[instrument(skip(intermediate_dir), fields(dir = %intermediate_dir.display()))]
pub fn run_verification(intermediate_dir: &Path) -> Result<VerificationOutcome> {
    let current = intermediate_hashes(intermediate_dir)?;
    let reference_path = intermediate_dir.join(REFERENCE_FILE);

    if !reference_path.exists() {
        let json = serde_json::to_string_pretty(&current)?;
        atomic_write(&reference_path, json.as_bytes())?;
        info!(
            "No reference found; stored {} hashes as baseline",
            current.len()
        );
        return Ok(VerificationOutcome::BaselineCreated {
            path: reference_path,
        });
    }

    let reference: HashMapping = serde_json::from_str(&fs::read_to_string(&reference_path)?)?;
    if current == reference {
        info!("Reproducibility verified: {} artifacts match", current.len());
        Ok(VerificationOutcome::Match)
    } else {
        warn!("Hash mismatch against {}", reference_path.display());
        Ok(VerificationOutcome::Mismatch { current, reference })
    }
}

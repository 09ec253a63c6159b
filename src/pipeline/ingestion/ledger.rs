use crate::constants::LEDGER_FILE;
use crate::error::Result;
use crate::storage::atomic_write;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent set of SHA-256 hashes of already-ingested source files.
///
/// The ledger only grows. It is flushed after every successfully ingested
/// file so a crash never loses recorded hashes. Single writer assumed: two
/// concurrent ingestors would race on load-then-save.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    hashes: BTreeSet<String>,
}

impl Ledger {
    /// Loads `<dir>/.processed_hashes.json`, or starts empty if absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        let hashes = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<Vec<String>>(&content)?
                .into_iter()
                .collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self { path, hashes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Returns false if the hash was already present.
    pub fn insert(&mut self, hash: String) -> bool {
        self.hashes.insert(hash)
    }

    /// Writes the ledger as a sorted JSON array.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.hashes)?;
        atomic_write(&self.path, json.as_bytes())
    }

    /// Inserts and flushes immediately.
    pub fn record(&mut self, hash: String) -> Result<bool> {
        let added = self.insert(hash);
        if added {
            self.persist()?;
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_ledger_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::load(dir.path()).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.path().exists());
    }

    #[test]
    fn record_persists_immediately_and_dedupes() {
        let dir = tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path()).unwrap();

        assert!(ledger.record("bb".repeat(32)).unwrap());
        assert!(ledger.record("aa".repeat(32)).unwrap());
        assert!(!ledger.record("bb".repeat(32)).unwrap());

        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap())
                .unwrap();
        assert_eq!(on_disk, vec!["aa".repeat(32), "bb".repeat(32)]);

        let reloaded = Ledger::load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&"aa".repeat(32)));
    }

    #[test]
    fn corrupt_ledger_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LEDGER_FILE), "{not json").unwrap();
        assert!(Ledger::load(dir.path()).is_err());
    }
}

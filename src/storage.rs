use crate::error::{EtlError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Write-to-temp-then-rename. The temp file lives next to `target` so the
/// rename stays on one filesystem; on failure it is removed and the target is
/// left as it was.
pub fn atomic_write(target: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = target.with_extension("tmp");

    match write_synced_then_rename(&tmp_path, target, bytes) {
        Ok(()) => {
            sync_parent_dir(target);
            debug!("Atomically wrote {}", target.display());
            Ok(())
        }
        Err(source) => {
            if tmp_path.exists() {
                let _ = fs::remove_file(&tmp_path);
            }
            error!("Atomic write to {} failed: {}", target.display(), source);
            Err(EtlError::AtomicWrite {
                path: target.to_path_buf(),
                source,
            })
        }
    }
}

fn write_synced_then_rename(tmp_path: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, target)
}

// Persist the rename itself; best effort, not every platform allows it.
#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

/// Regular, non-hidden files in `dir` (non-recursive) with the given
/// extension, sorted by file name.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = file_name(&path);
        if name.starts_with('.') {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Final path component as an owned string (lossy for non-UTF-8 names).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! All-or-nothing file publication.
//!
//! Bytes are written to a staging file next to the target, flushed to disk,
//! and renamed over the target. Readers see either the old file or the new
//! one, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DuelError, Result};

/// Staging path used while publishing `target`: `.<name>.tmp` in the same
/// directory, so the final rename never crosses filesystems.
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.tmp"))
}

/// Atomically replaces `target` with `bytes`, creating parent directories.
///
/// # Errors
///
/// Returns `Io` naming the path that failed. The staging file is removed on
/// failure and `target` is left untouched.
pub fn publish_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    if target.file_name().is_none() {
        return Err(DuelError::config(
            "output",
            format!("`{}` does not name a file", target.display()),
        ));
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DuelError::io(parent, e))?;
    }

    let staging = staging_path(target);
    let written = write_synced(&staging, bytes)
        .and_then(|()| fs::rename(&staging, target).map_err(|e| DuelError::io(target, e)));
    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written?;

    debug!(path = %target.display(), bytes = bytes.len(), "published");
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| DuelError::io(path, e))?;
    file.write_all(bytes).map_err(|e| DuelError::io(path, e))?;
    file.sync_all().map_err(|e| DuelError::io(path, e))
}

//! Atomic file writes.
//!
//! Content goes to a uniquely named hidden temporary file in the same
//! directory, is fsynced, then renamed over the target. No OS-level file
//! locks are taken; concurrent writers resolve as last rename wins.

use archway_core::{ArchwayError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `content` to `path` via tmp file + rename, creating parent
/// directories as needed.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let path: PathBuf = path.to_path_buf();
    let content = content.to_vec();

    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .map_err(|e| ArchwayError::internal(format!("Atomic write task failed: {}", e)))?
}

fn write_atomic_blocking(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ArchwayError::io(format!("{} has no parent directory", path.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| ArchwayError::io_at(parent, e))?;

    // Removed on drop if anything below fails.
    let mut tmp_file = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| ArchwayError::io_at(parent, e))?;

    tmp_file
        .write_all(content)
        .map_err(|e| ArchwayError::io_at(tmp_file.path(), e))?;
    tmp_file
        .as_file()
        .sync_all()
        .map_err(|e| ArchwayError::io_at(tmp_file.path(), e))?;

    tmp_file
        .persist(path)
        .map_err(|e| ArchwayError::io_at(path, e.error))?;
    Ok(())
}

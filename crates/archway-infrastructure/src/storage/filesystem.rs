//! File-system helpers shared by the storage adapters.

use archway_core::workspace::{Image, ImageContent, is_image_filename};
use archway_core::{ArchwayError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, warn};

/// Latest JSON content of a workspace branch.
pub const WORKSPACE_JSON_FILENAME: &str = "workspace.json";
/// DSL authoring source (local variants).
pub const WORKSPACE_DSL_FILENAME: &str = "workspace.dsl";
/// Persisted metadata (server variant).
pub const WORKSPACE_PROPERTIES_FILENAME: &str = "workspace.properties";
/// Parent directory of named branches.
pub const BRANCHES_DIRECTORY: &str = "branches";
/// Name of the per-workspace image directory.
pub const IMAGES_DIRECTORY: &str = "images";

/// A directory entry reduced to what the adapters need.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

/// Reads a UTF-8 file, mapping "does not exist" to `None`.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArchwayError::io_at(path, e)),
    }
}

/// Lists a directory; a missing directory is empty.
pub async fn list_directory(dir: &Path) -> Result<Vec<DirEntryInfo>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArchwayError::io_at(dir, e)),
    };

    let mut result = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ArchwayError::io_at(dir, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        result.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    Ok(result)
}

/// Modification time of a path in milliseconds since the epoch.
pub fn modified_millis(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(system_time_millis(modified))
}

pub fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}

fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Recursively removes a directory.
///
/// # Returns
///
/// - `Ok(true)`: The directory existed and was removed
/// - `Ok(false)`: There was nothing to remove
pub async fn delete_directory(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Deleted {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ArchwayError::io_at(dir, e)),
    }
}

/// Moves a file, falling back to copy + delete across file systems.
pub async fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ArchwayError::io_at(parent, e))?;
    }

    if fs::rename(source, destination).await.is_ok() {
        return Ok(());
    }

    fs::copy(source, destination)
        .await
        .map_err(|e| ArchwayError::io_at(source, e))?;
    fs::remove_file(source)
        .await
        .map_err(|e| ArchwayError::io_at(source, e))
}

/// Rejects image names that would escape the image directory.
pub fn validate_image_filename(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let is_plain = path.file_name().is_some_and(|name| name == path.as_os_str());
    if filename.is_empty() || !is_plain || filename.starts_with('.') {
        return Err(ArchwayError::validation(format!(
            "Invalid image filename \"{}\"",
            filename
        )));
    }
    Ok(())
}

/// Reads an image with its content type. Failures are logged and give `None`.
pub async fn read_image(path: &Path) -> Option<ImageContent> {
    match fs::read(path).await {
        Ok(bytes) => {
            let content_type = mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            Some(ImageContent {
                content_type,
                bytes,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Could not read image {}: {}", path.display(), e);
            None
        }
    }
}

/// Lists `.png` / `.svg` files in `dir`, sorted case-insensitively by name.
pub async fn list_images(dir: &Path) -> Vec<Image> {
    let entries = match list_directory(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list images in {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    for entry in entries {
        if entry.is_dir || !is_image_filename(&entry.name) {
            continue;
        }

        let path = dir.join(&entry.name);
        match fs::metadata(&path).await {
            Ok(meta) => images.push(Image {
                name: entry.name,
                size_in_bytes: meta.len(),
                last_modified_date: meta
                    .modified()
                    .map(system_time_to_utc)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            }),
            Err(e) => warn!("Could not read {}: {}", path.display(), e),
        }
    }

    images.sort_by_key(|image| image.name.to_lowercase());
    images
}

/// Deletes every file in `dir` and then the directory itself.
///
/// # Returns
///
/// - `Ok(true)`: The directory is gone
/// - `Ok(false)`: It did not exist
pub async fn delete_images(dir: &Path) -> Result<bool> {
    let entries = list_directory(dir).await?;
    if entries.is_empty() && fs::metadata(dir).await.is_err() {
        return Ok(false);
    }

    for entry in entries.iter().filter(|e| !e.is_dir) {
        let path = dir.join(&entry.name);
        fs::remove_file(&path)
            .await
            .map_err(|e| ArchwayError::io_at(&path, e))?;
    }

    delete_directory(dir).await.map(|_| true)
}

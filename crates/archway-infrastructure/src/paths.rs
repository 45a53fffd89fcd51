//! Default locations for the archway configuration and data.
//!
//! ```text
//! ~/.config/archway/            # Config directory
//! └── archway.toml              # Installation configuration
//!
//! ~/.local/share/archway/       # Data directory
//! ├── 1/                        # One directory per workspace
//! └── 2/
//! ```

use archway_core::config::CONFIG_FILENAME;
use std::path::PathBuf;

const APP_NAME: &str = "archway";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for archway_core::ArchwayError {
    fn from(err: PathError) -> Self {
        archway_core::ArchwayError::config(err.to_string())
    }
}

/// Platform path resolution for archway.
pub struct ArchwayPaths;

impl ArchwayPaths {
    /// Returns the configuration directory (e.g., `~/.config/archway/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the default data directory (e.g., `~/.local/share/archway/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }
}

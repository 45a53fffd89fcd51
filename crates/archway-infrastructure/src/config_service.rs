//! Configuration service implementation.
//!
//! Loads `ArchwayConfig` from `archway.toml`, applies environment overrides,
//! and resolves the data directory.

use crate::paths::ArchwayPaths;
use archway_core::config::ArchwayConfig;
use archway_core::{ArchwayError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Overrides `data_directory`.
pub const ENV_DATA_DIRECTORY: &str = "ARCHWAY_DATA_DIRECTORY";
/// Overrides `encryption.passphrase`.
pub const ENV_PASSPHRASE: &str = "ARCHWAY_PASSPHRASE";
/// Overrides `logging.level`.
pub const ENV_LOG: &str = "ARCHWAY_LOG";

/// Configuration service that loads and caches the installation configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ArchwayConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading the platform default location.
    pub fn with_default_path() -> Result<Self> {
        Ok(Self::new(ArchwayPaths::config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading it from file if not cached.
    pub fn get_config(&self) -> Result<ArchwayConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| ArchwayError::internal("config cache lock poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = load_config(&self.path, |key| std::env::var(key).ok())?;

        {
            let mut write_lock = self
                .config
                .write()
                .map_err(|_| ArchwayError::internal("config cache lock poisoned"))?;
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }
}

/// Reads the configuration file (a missing file means defaults), applies
/// overrides from `env`, and resolves the data directory.
pub fn load_config<F>(path: &Path, env: F) -> Result<ArchwayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match std::fs::read_to_string(path) {
        Ok(content) => {
            info!("Loading configuration from {}", path.display());
            ArchwayConfig::from_toml(&content)?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No configuration at {}, using defaults", path.display());
            ArchwayConfig::default()
        }
        Err(e) => return Err(ArchwayError::io_at(path, e)),
    };

    apply_env_overrides(&mut config, env);

    if config.data_directory.is_none() {
        config.data_directory = Some(ArchwayPaths::data_dir()?);
    }

    Ok(config)
}

fn apply_env_overrides<F>(config: &mut ArchwayConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(dir) = non_empty(ENV_DATA_DIRECTORY) {
        config.data_directory = Some(PathBuf::from(dir));
    }
    if let Some(passphrase) = non_empty(ENV_PASSPHRASE) {
        config.encryption.passphrase = Some(passphrase);
    }
    if let Some(level) = non_empty(ENV_LOG) {
        config.logging.level = level;
    }
}

//! Installation configuration.
//!
//! Deserialized from `archway.toml`; every field has a default so an empty
//! file is a valid configuration.

use crate::collaborator::ScopeValidation;
use crate::error::{ArchwayError, Result};
use crate::user::AccessPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILENAME: &str = "archway.toml";

/// Deployment profile.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// DSL authoring against a local directory, no versions or branches.
    Local,
    /// Multi-tenant versioned store.
    #[default]
    Server,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ArchwayConfig {
    #[serde(default)]
    pub profile: Profile,
    /// Root of the workspace tree. Resolved by the loader when unset.
    #[serde(default)]
    pub data_directory: Option<PathBuf>,
    /// Local profile only: treat the data directory as one workspace.
    #[serde(default)]
    pub single_workspace: bool,
    /// Registry key of the server storage backend.
    #[serde(default = "default_data_storage")]
    pub data_storage: String,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub workspace: WorkspaceLimits,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub authentication: AuthenticationConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ArchwayConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            data_directory: None,
            single_workspace: false,
            data_storage: default_data_storage(),
            cache: CacheConfig::default(),
            workspace: WorkspaceLimits::default(),
            encryption: EncryptionConfig::default(),
            authentication: AuthenticationConfig::default(),
            features: FeatureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ArchwayConfig {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workspace.threads == 0 {
            return Err(ArchwayError::config("workspace.threads must be at least 1"));
        }
        if self.encryption.iterations == 0 {
            return Err(ArchwayError::config(
                "encryption.iterations must be at least 1",
            ));
        }
        parse_size(&self.workspace.max_size)?;
        Ok(())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            self.authentication.enabled,
            self.authentication.admin_users_and_roles.iter().cloned(),
        )
    }

    /// Maximum content size in bytes; `0` disables the check.
    pub fn max_workspace_size(&self) -> u64 {
        parse_size(&self.workspace.max_size).unwrap_or(DEFAULT_MAX_SIZE_BYTES)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Registry key: `none` or `memory`.
    #[serde(default = "default_cache_implementation")]
    pub implementation: String,
    #[serde(default = "default_cache_expiry_minutes")]
    pub expiry_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            implementation: default_cache_implementation(),
            expiry_minutes: default_cache_expiry_minutes(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLimits {
    /// Worker count for concurrent metadata fetches.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Human readable size, e.g. `"1MB"`, `"512KB"`, `"0"`.
    #[serde(default = "default_max_size")]
    pub max_size: String,
    #[serde(default = "default_max_versions")]
    pub max_versions: usize,
}

impl Default for WorkspaceLimits {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_size: default_max_size(),
            max_versions: default_max_versions(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    /// Server-side encryption passphrase; unset disables encryption.
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            passphrase: None,
            iterations: default_iterations(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub admin_users_and_roles: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureConfig {
    /// Soft-delete workspaces instead of removing them.
    #[serde(default)]
    pub archiving: bool,
    #[serde(default)]
    pub branches: bool,
    #[serde(default)]
    pub scope_validation: ScopeValidation,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `archway=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const DEFAULT_MAX_SIZE_BYTES: u64 = 1_000_000;

fn default_data_storage() -> String {
    "file".to_string()
}

fn default_cache_implementation() -> String {
    "none".to_string()
}

fn default_cache_expiry_minutes() -> u64 {
    5
}

fn default_threads() -> usize {
    10
}

fn default_max_size() -> String {
    "1MB".to_string()
}

fn default_max_versions() -> usize {
    30
}

fn default_iterations() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parses a human readable size into bytes (decimal units).
pub fn parse_size(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: f64 = number
        .parse()
        .map_err(|_| ArchwayError::config(format!("Invalid size: {}", value)))?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" | "K" => 1_000.0,
        "MB" | "M" => 1_000_000.0,
        "GB" | "G" => 1_000_000_000.0,
        other => {
            return Err(ArchwayError::config(format!(
                "Invalid size unit \"{}\" in {}",
                other, value
            )));
        }
    };

    Ok((number * multiplier).round() as u64)
}

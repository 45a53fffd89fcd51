//! Name-keyed tables of storage and cache implementations.
//!
//! The configuration names a backend by string (`data_storage`,
//! `cache.implementation`); the registries map those names to factories.
//! Both start with the built-in implementations and accept more at runtime.

use crate::adapter::{LocalFileSystemWorkspaceAdapter, ServerFileSystemWorkspaceAdapter};
use crate::cache::{InMemoryWorkspaceMetadataCache, NoOpWorkspaceMetadataCache};
use crate::paths::ArchwayPaths;
use archway_core::collaborator::{
    DslParser, ScopeValidator, UnsupportedDslParser, WorkspaceValidator,
};
use archway_core::config::{ArchwayConfig, Profile};
use archway_core::workspace::{WorkspaceAdapter, WorkspaceMetadataCache};
use archway_core::{ArchwayError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub const FILE_STORAGE: &str = "file";
pub const NO_CACHE: &str = "none";
pub const MEMORY_CACHE: &str = "memory";

/// Collaborators handed to adapter factories.
#[derive(Clone)]
pub struct StorageContext {
    pub parser: Arc<dyn DslParser>,
    pub validator: Arc<dyn WorkspaceValidator>,
}

impl StorageContext {
    pub fn new(parser: Arc<dyn DslParser>, validator: Arc<dyn WorkspaceValidator>) -> Self {
        Self { parser, validator }
    }

    /// No DSL support; scope validation from `config`.
    pub fn from_config(config: &ArchwayConfig) -> Self {
        Self::new(
            Arc::new(UnsupportedDslParser),
            Arc::new(ScopeValidator::new(config.features.scope_validation)),
        )
    }
}

pub type AdapterFactory = Arc<
    dyn Fn(&ArchwayConfig, &StorageContext) -> Result<Arc<dyn WorkspaceAdapter>> + Send + Sync,
>;

pub type CacheFactory = Arc<dyn Fn(&ArchwayConfig) -> Result<Arc<dyn WorkspaceMetadataCache>> + Send + Sync>;

/// Server storage backends by name.
///
/// The local profile bypasses the table: it always uses the local adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            FILE_STORAGE,
            Arc::new(
                |config: &ArchwayConfig, _: &StorageContext| -> Result<Arc<dyn WorkspaceAdapter>> {
                    let adapter = ServerFileSystemWorkspaceAdapter::new(data_directory(config)?)?;
                    Ok(Arc::new(adapter))
                },
            ),
        );
        registry
    }

    pub fn register(&mut self, name: &str, factory: AdapterFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the adapter selected by `config`.
    ///
    /// Local adapters start a staleness scanner, so this must run inside a
    /// Tokio runtime.
    pub fn create(
        &self,
        config: &ArchwayConfig,
        context: &StorageContext,
    ) -> Result<Arc<dyn WorkspaceAdapter>> {
        if config.profile == Profile::Local {
            let directory = data_directory(config)?;
            let adapter = if config.single_workspace {
                LocalFileSystemWorkspaceAdapter::single(
                    directory,
                    Arc::clone(&context.parser),
                    Arc::clone(&context.validator),
                )?
            } else {
                LocalFileSystemWorkspaceAdapter::multiple(
                    directory,
                    Arc::clone(&context.parser),
                    Arc::clone(&context.validator),
                )?
            };
            return Ok(Arc::new(adapter));
        }

        let name = config.data_storage.to_lowercase();
        let factory = self.factories.get(&name).ok_or_else(|| {
            ArchwayError::config(format!(
                "Unknown data storage implementation '{}' (available: {})",
                config.data_storage,
                self.names().join(", ")
            ))
        })?;

        info!("Creating '{}' workspace storage", name);
        factory(config, context)
    }
}

/// Metadata cache implementations by name.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    factories: HashMap<String, CacheFactory>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            NO_CACHE,
            Arc::new(|_: &ArchwayConfig| -> Result<Arc<dyn WorkspaceMetadataCache>> {
                Ok(Arc::new(NoOpWorkspaceMetadataCache))
            }),
        );
        registry.register(
            MEMORY_CACHE,
            Arc::new(|config: &ArchwayConfig| -> Result<Arc<dyn WorkspaceMetadataCache>> {
                Ok(Arc::new(InMemoryWorkspaceMetadataCache::with_expiry_minutes(
                    config.cache.expiry_minutes,
                )))
            }),
        );
        registry
    }

    pub fn register(&mut self, name: &str, factory: CacheFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    pub fn create(&self, config: &ArchwayConfig) -> Result<Arc<dyn WorkspaceMetadataCache>> {
        let name = config.cache.implementation.to_lowercase();
        let factory = self.factories.get(&name).ok_or_else(|| {
            ArchwayError::config(format!(
                "Unknown cache implementation '{}'",
                config.cache.implementation
            ))
        })?;
        factory(config)
    }
}

fn data_directory(config: &ArchwayConfig) -> Result<PathBuf> {
    match &config.data_directory {
        Some(dir) => Ok(dir.clone()),
        None => Ok(ArchwayPaths::data_dir()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archway_core::workspace::WorkspaceMetadata;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ArchwayConfig {
        ArchwayConfig {
            data_directory: Some(dir.path().to_path_buf()),
            ..ArchwayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_default_file_storage() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        let adapter = AdapterRegistry::with_defaults()
            .create(&config, &StorageContext::from_config(&config))
            .unwrap();

        adapter
            .put_workspace_metadata(&WorkspaceMetadata::new(3))
            .await
            .unwrap();
        assert!(temp_dir.path().join("3").join("workspace.properties").exists());
    }

    #[tokio::test]
    async fn test_unknown_storage_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        config.data_storage = "s3".to_string();

        let result = AdapterRegistry::with_defaults()
            .create(&config, &StorageContext::from_config(&config));
        assert!(matches!(result, Err(ArchwayError::Config(_))));
    }

    #[tokio::test]
    async fn test_local_profile_uses_local_adapter() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        config.profile = Profile::Local;
        config.single_workspace = true;

        let adapter = AdapterRegistry::with_defaults()
            .create(&config, &StorageContext::from_config(&config))
            .unwrap();

        assert_eq!(adapter.workspace_ids().await.unwrap().len(), 1);
        assert!(temp_dir.path().join("workspace.dsl").exists());
        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn test_registered_factory_is_used() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(&temp_dir);
        config.data_storage = "Custom".to_string();

        let mut registry = AdapterRegistry::new();
        let nested = temp_dir.path().join("nested");
        registry.register(
            "custom",
            Arc::new(
                move |_: &ArchwayConfig, _: &StorageContext| -> Result<Arc<dyn WorkspaceAdapter>> {
                    Ok(Arc::new(ServerFileSystemWorkspaceAdapter::new(&nested)?))
                },
            ),
        );

        registry
            .create(&config, &StorageContext::from_config(&config))
            .unwrap();
        assert!(temp_dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn test_cache_registry() {
        let mut config = ArchwayConfig::default();
        let registry = CacheRegistry::with_defaults();

        let none = registry.create(&config).unwrap();
        none.put(&WorkspaceMetadata::new(1)).await;
        assert!(none.get(1).await.is_none());

        config.cache.implementation = "memory".to_string();
        let memory = registry.create(&config).unwrap();
        memory.put(&WorkspaceMetadata::new(1)).await;
        assert!(memory.get(1).await.is_some());

        config.cache.implementation = "redis".to_string();
        assert!(registry.create(&config).is_err());
    }
}

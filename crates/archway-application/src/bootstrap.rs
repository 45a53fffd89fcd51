//! Builds a `WorkspaceService` from configuration.

use crate::workspace_service::{ServiceSettings, WorkspaceService};
use archway_core::Result;
use archway_core::config::ArchwayConfig;
use archway_infrastructure::{AdapterRegistry, AesEncryptionStrategy, CacheRegistry, StorageContext};
use std::sync::Arc;
use tracing::info;

/// Assembles the service with the built-in storage and cache registries.
///
/// Must be called from within a Tokio runtime.
pub fn build_service(config: &ArchwayConfig) -> Result<WorkspaceService> {
    build_service_with(
        config,
        &AdapterRegistry::with_defaults(),
        &CacheRegistry::with_defaults(),
        StorageContext::from_config(config),
    )
}

pub fn build_service_with(
    config: &ArchwayConfig,
    adapters: &AdapterRegistry,
    caches: &CacheRegistry,
    context: StorageContext,
) -> Result<WorkspaceService> {
    config.validate()?;

    let adapter = adapters.create(config, &context)?;
    let cache = caches.create(config)?;
    let settings = ServiceSettings::from_config(config);

    let mut service = WorkspaceService::new(adapter, cache, settings)
        .with_validator(Arc::clone(&context.validator));

    if let Some(passphrase) = config
        .encryption
        .passphrase
        .as_deref()
        .filter(|passphrase| !passphrase.is_empty())
    {
        service = service.with_encryption(AesEncryptionStrategy::new(
            passphrase,
            config.encryption.iterations,
        )?);
        info!("Server-side encryption enabled");
    }

    Ok(service)
}

//! The workspace façade.
//!
//! `WorkspaceService` is the single entry point callers use. It composes a
//! storage adapter, a metadata cache, optional server-side encryption and
//! the installation's access settings, and applies the engine rules
//! (locking, visibility, size ceiling, id allocation) on top of them.

mod content;
mod locking;
mod sharing;
mod visibility;

pub use locking::LockOutcome;
pub use visibility::{VisibleWorkspace, WorkspaceAccess};

use archway_core::collaborator::{
    NoOpSearchIndexer, ScopeValidation, ScopeValidator, SearchIndexer, WorkspaceValidator,
};
use archway_core::config::ArchwayConfig;
use archway_core::user::{AccessPolicy, User};
use archway_core::workspace::{
    Image, ImageContent, WorkspaceAdapter, WorkspaceDocument, WorkspaceId, WorkspaceMetadata,
    WorkspaceMetadataCache, is_image_filename,
};
use archway_core::{ArchwayError, Result};
use archway_infrastructure::AesEncryptionStrategy;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Installation settings the façade enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub access_policy: AccessPolicy,
    /// Soft-delete instead of removing workspace directories.
    pub archiving: bool,
    pub branches: bool,
    /// Maximum stored content size in bytes; `0` disables the check.
    pub max_workspace_size: u64,
    pub max_versions: usize,
    /// Concurrent metadata fetches during listings.
    pub threads: usize,
    pub scope_validation: ScopeValidation,
}

impl ServiceSettings {
    pub fn from_config(config: &ArchwayConfig) -> Self {
        Self {
            access_policy: config.access_policy(),
            archiving: config.features.archiving,
            branches: config.features.branches,
            max_workspace_size: config.max_workspace_size(),
            max_versions: config.workspace.max_versions,
            threads: config.workspace.threads.max(1),
            scope_validation: config.features.scope_validation,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&ArchwayConfig::default())
    }
}

pub struct WorkspaceService {
    adapter: Arc<dyn WorkspaceAdapter>,
    cache: Arc<dyn WorkspaceMetadataCache>,
    encryption: Option<Arc<AesEncryptionStrategy>>,
    validator: Arc<dyn WorkspaceValidator>,
    search_indexer: Arc<dyn SearchIndexer>,
    settings: ServiceSettings,
    fetch_permits: Arc<Semaphore>,
}

impl WorkspaceService {
    pub fn new(
        adapter: Arc<dyn WorkspaceAdapter>,
        cache: Arc<dyn WorkspaceMetadataCache>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            adapter,
            cache,
            encryption: None,
            validator: Arc::new(ScopeValidator::new(settings.scope_validation)),
            search_indexer: Arc::new(NoOpSearchIndexer),
            fetch_permits: Arc::new(Semaphore::new(settings.threads.max(1))),
            settings,
        }
    }

    /// Encrypts stored content with the installation passphrase.
    pub fn with_encryption(mut self, encryption: AesEncryptionStrategy) -> Self {
        self.encryption = Some(Arc::new(encryption));
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn WorkspaceValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_search_indexer(mut self, search_indexer: Arc<dyn SearchIndexer>) -> Self {
        self.search_indexer = search_indexer;
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn adapter(&self) -> &Arc<dyn WorkspaceAdapter> {
        &self.adapter
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Metadata of a live workspace; `None` when missing or archived.
    pub async fn get_workspace_metadata(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMetadata>> {
        let metadata =
            load_metadata(self.adapter.as_ref(), self.cache.as_ref(), workspace_id).await?;
        Ok(metadata.filter(|metadata| !metadata.archived))
    }

    pub(crate) async fn require_metadata(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<WorkspaceMetadata> {
        self.get_workspace_metadata(workspace_id)
            .await?
            .ok_or_else(|| ArchwayError::not_found("Workspace", workspace_id.to_string()))
    }

    /// Writes metadata through to the adapter, then the cache.
    pub async fn put_workspace_metadata(&self, metadata: &WorkspaceMetadata) -> Result<()> {
        self.adapter.put_workspace_metadata(metadata).await?;
        self.cache.put(metadata).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// All live workspaces, sorted by id.
    pub async fn get_workspaces(&self) -> Result<Vec<WorkspaceMetadata>> {
        let mut workspaces = self.fetch_all_metadata().await?;
        workspaces.retain(|metadata| !metadata.archived);
        Ok(workspaces)
    }

    /// Archived workspaces, for administrative use.
    pub async fn get_archived_workspaces(&self) -> Result<Vec<WorkspaceMetadata>> {
        let mut workspaces = self.fetch_all_metadata().await?;
        workspaces.retain(|metadata| metadata.archived);
        Ok(workspaces)
    }

    /// Fetches metadata for every id on a bounded set of tasks.
    ///
    /// Ids whose fetch fails are logged and left out.
    async fn fetch_all_metadata(&self) -> Result<Vec<WorkspaceMetadata>> {
        let ids = self.adapter.workspace_ids().await?;
        let mut tasks = JoinSet::new();

        for workspace_id in ids {
            let adapter = Arc::clone(&self.adapter);
            let cache = Arc::clone(&self.cache);
            let permits = Arc::clone(&self.fetch_permits);

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (workspace_id, Err(ArchwayError::internal(e.to_string()))),
                };
                let metadata = load_metadata(adapter.as_ref(), cache.as_ref(), workspace_id).await;
                (workspace_id, metadata)
            });
        }

        let mut workspaces = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(Some(metadata)))) => workspaces.push(metadata),
                Ok((_, Ok(None))) => {}
                Ok((workspace_id, Err(e))) => {
                    warn!("An error occurred while fetching workspace {}: {}", workspace_id, e);
                }
                Err(e) => warn!("Workspace metadata task failed: {}", e),
            }
        }

        workspaces.sort_by_key(|metadata| metadata.id);
        Ok(workspaces)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Creates a workspace with the next free id and returns that id.
    pub async fn create_workspace(&self, user: Option<&User>) -> Result<WorkspaceId> {
        let workspace_id = self
            .adapter
            .workspace_ids()
            .await?
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1;

        let mut metadata = WorkspaceMetadata::new(workspace_id);
        metadata.api_key = Some(Uuid::new_v4().to_string());
        metadata.api_secret = Some(Uuid::new_v4().to_string());
        metadata.owner = user
            .filter(|user| user.is_authenticated())
            .map(|user| user.username.clone());
        self.put_workspace_metadata(&metadata).await?;

        let mut workspace = WorkspaceDocument::new_empty(
            &format!("Workspace {:04}", workspace_id),
            "Description",
        );
        if self.settings.scope_validation == ScopeValidation::Strict {
            workspace.set_scope("SoftwareSystem");
        }

        self.put_workspace(workspace_id, "", &workspace.to_json()?)
            .await?;

        info!("Created workspace {}", workspace_id);
        Ok(workspace_id)
    }

    /// Archives or removes a workspace, depending on the archiving feature.
    pub async fn delete_workspace(&self, workspace_id: WorkspaceId) -> Result<bool> {
        if self.settings.archiving {
            debug!("Archiving workspace {}", workspace_id);
            let mut metadata = self.require_metadata(workspace_id).await?;
            metadata.archived = true;
            self.put_workspace_metadata(&metadata).await?;
            return Ok(true);
        }

        debug!("Deleting workspace {}", workspace_id);
        let deleted = self.adapter.delete_workspace(workspace_id).await?;
        if deleted {
            self.search_indexer.delete(workspace_id);
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Moves `source` into the workspace's image store.
    pub async fn put_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
        source: &Path,
    ) -> Result<()> {
        if !is_image_filename(filename) {
            return Err(ArchwayError::validation(format!(
                "{} is not an image",
                filename
            )));
        }
        self.check_branch(branch)?;
        self.adapter
            .put_image(workspace_id, branch, filename, source)
            .await
    }

    pub async fn get_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
    ) -> Option<ImageContent> {
        if let Err(e) = self.check_branch(branch) {
            warn!("{}", e);
            return None;
        }
        self.adapter.get_image(workspace_id, branch, filename).await
    }

    pub async fn get_images(&self, workspace_id: WorkspaceId) -> Vec<Image> {
        self.adapter.images(workspace_id).await
    }

    pub async fn delete_images(&self, workspace_id: WorkspaceId) -> Result<bool> {
        self.adapter.delete_images(workspace_id).await
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Prunes every workspace down to the configured number of versions.
    pub async fn remove_old_workspace_versions(&self) {
        debug!("Removing old workspace versions");
        self.adapter
            .remove_old_workspace_versions(self.settings.max_versions)
            .await;
    }

    /// Latest source modification seen by the adapter (epoch millis).
    pub fn last_modified_date(&self) -> i64 {
        self.adapter.last_modified_date()
    }

    pub async fn shutdown(&self) {
        self.cache.shutdown().await;
        self.adapter.shutdown().await;
        info!("Workspace service stopped");
    }
}

/// Cache first, then the adapter; adapter hits are written back to the cache.
async fn load_metadata(
    adapter: &dyn WorkspaceAdapter,
    cache: &dyn WorkspaceMetadataCache,
    workspace_id: WorkspaceId,
) -> Result<Option<WorkspaceMetadata>> {
    if let Some(metadata) = cache.get(workspace_id).await {
        return Ok(Some(metadata));
    }

    let metadata = adapter.get_workspace_metadata(workspace_id).await?;
    if let Some(metadata) = &metadata {
        cache.put(metadata).await;
    }
    Ok(metadata)
}

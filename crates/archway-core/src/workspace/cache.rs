//! Metadata cache trait.

use super::id::WorkspaceId;
use super::metadata::WorkspaceMetadata;
use async_trait::async_trait;

/// Write-through cache in front of adapter metadata reads.
///
/// Every metadata write made through the workspace service is also
/// written here, so a hit is always at least as fresh as this process's
/// last write.
#[async_trait]
pub trait WorkspaceMetadataCache: Send + Sync {
    async fn get(&self, workspace_id: WorkspaceId) -> Option<WorkspaceMetadata>;

    async fn put(&self, metadata: &WorkspaceMetadata);

    async fn shutdown(&self) {}
}

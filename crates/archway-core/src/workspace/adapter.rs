//! Storage backend trait.
//!
//! Defines how workspaces are persisted. Each storage variant (local single
//! workspace, local directory-per-id, versioned server store) is an
//! independent implementation selected at startup.

use super::id::WorkspaceId;
use super::image::{Image, ImageContent};
use super::metadata::WorkspaceMetadata;
use super::version::WorkspaceVersion;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

/// Persistence strategy over a directory tree.
///
/// # Branches and versions
///
/// A `branch` argument of `""` or `"main"` addresses the primary line. A
/// `version` argument of `""` addresses the latest content; otherwise it
/// selects a snapshot by exact version id. Callers validate branch names
/// before calling into an adapter.
///
/// # Error policy
///
/// Writes return `Err` on failure. Reads on non-critical paths (images,
/// version and branch listings, pruning) log and degrade to empty values.
#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    /// Lists the ids of all stored workspaces.
    ///
    /// # Returns
    ///
    /// - `Ok(BTreeSet<WorkspaceId>)`: Positive ids in ascending order
    /// - `Err(_)`: The data directory could not be read
    async fn workspace_ids(&self) -> Result<BTreeSet<WorkspaceId>>;

    /// Finds the metadata of a workspace.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(WorkspaceMetadata))`: Metadata found
    /// - `Ok(None)`: No metadata stored for this id
    /// - `Err(_)`: Error occurred during retrieval
    async fn get_workspace_metadata(&self, workspace_id: WorkspaceId)
    -> Result<Option<WorkspaceMetadata>>;

    /// Saves workspace metadata.
    ///
    /// Variants without a metadata store accept and discard the write.
    async fn put_workspace_metadata(&self, metadata: &WorkspaceMetadata) -> Result<()>;

    /// Deletes a workspace and everything stored under it.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The workspace was removed
    /// - `Ok(false)`: Nothing was removed
    /// - `Err(_)`: Error occurred during deletion
    async fn delete_workspace(&self, workspace_id: WorkspaceId) -> Result<bool>;

    /// Reads workspace content.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - The ID of the workspace
    /// * `branch` - Branch name, `""` for the primary line
    /// * `version` - Version id, `""` for the latest content
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: The stored JSON
    /// - `Ok(None)`: No content for this id/branch/version
    /// - `Err(_)`: Error occurred during retrieval
    async fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        version: &str,
    ) -> Result<Option<String>>;

    /// Writes workspace content as the latest version of a branch.
    ///
    /// Versioned variants also record a snapshot named after
    /// `metadata.last_modified_date`.
    async fn put_workspace(&self, metadata: &WorkspaceMetadata, json: &str, branch: &str)
    -> Result<()>;

    /// Lists versions of a branch, newest first, at most `max_versions`.
    ///
    /// The first entry describes the latest content and has no version id.
    async fn workspace_versions(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        max_versions: usize,
    ) -> Vec<WorkspaceVersion>;

    /// Deletes snapshots beyond the `max_versions` newest on every branch.
    async fn prune_workspace_versions(&self, workspace_id: WorkspaceId, max_versions: usize);

    /// Runs [`prune_workspace_versions`](Self::prune_workspace_versions) for
    /// every workspace.
    async fn remove_old_workspace_versions(&self, max_versions: usize) {
        match self.workspace_ids().await {
            Ok(ids) => {
                for id in ids {
                    self.prune_workspace_versions(id, max_versions).await;
                }
            }
            Err(e) => tracing::warn!("Could not list workspaces for pruning: {}", e),
        }
    }

    /// Lists branch names, sorted.
    async fn workspace_branches(&self, workspace_id: WorkspaceId) -> Vec<String>;

    /// Deletes a branch.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The branch was removed
    /// - `Ok(false)`: The name is the primary line or no such branch exists
    /// - `Err(_)`: Error occurred during deletion
    async fn delete_branch(&self, workspace_id: WorkspaceId, branch: &str) -> Result<bool>;

    /// Moves an image file into the workspace's image directory.
    async fn put_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
        source: &Path,
    ) -> Result<()>;

    /// Reads an image; failures degrade to `None`.
    async fn get_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
    ) -> Option<ImageContent>;

    /// Lists `.png` / `.svg` images of the primary line, sorted by name.
    async fn images(&self, workspace_id: WorkspaceId) -> Vec<Image>;

    /// Deletes all images of the primary line.
    async fn delete_images(&self, workspace_id: WorkspaceId) -> Result<bool>;

    /// Latest source modification time in milliseconds since the epoch.
    ///
    /// Versioned variants return `0`.
    fn last_modified_date(&self) -> i64 {
        0
    }

    /// Stops background work owned by the adapter.
    async fn shutdown(&self) {}
}

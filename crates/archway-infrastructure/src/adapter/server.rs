//! Versioned multi-tenant store.
//!
//! ```text
//! <data>/<id>/workspace.json                      latest content
//! <data>/<id>/workspace-<ts>.json                 version snapshot
//! <data>/<id>/workspace.properties                metadata
//! <data>/<id>/branches/<name>/workspace.json      latest content of a branch
//! <data>/<id>/branches/<name>/workspace-<ts>.json version snapshot of a branch
//! <data>/<id>/images/<filename>                   published diagrams
//! ```

use crate::properties::{parse_properties, write_properties};
use crate::storage::filesystem::{
    self, BRANCHES_DIRECTORY, IMAGES_DIRECTORY, WORKSPACE_JSON_FILENAME,
    WORKSPACE_PROPERTIES_FILENAME,
};
use crate::storage::write_atomic;
use archway_core::workspace::{
    Image, ImageContent, WorkspaceAdapter, WorkspaceId, WorkspaceMetadata, WorkspaceVersion,
    format_version_id, is_main_branch, is_numeric_name, is_valid_branch_name, is_version_id,
    parse_version_id, version_filename, version_id_from_filename,
};
use archway_core::{ArchwayError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// File-system adapter with version history, branches and images.
#[derive(Debug, Clone)]
pub struct ServerFileSystemWorkspaceAdapter {
    data_directory: PathBuf,
}

impl ServerFileSystemWorkspaceAdapter {
    /// Creates the adapter, creating `data_directory` if needed.
    pub fn new(data_directory: impl Into<PathBuf>) -> Result<Self> {
        let data_directory = data_directory.into();
        std::fs::create_dir_all(&data_directory)
            .map_err(|e| ArchwayError::io_at(&data_directory, e))?;
        info!(
            "Using server workspace storage at {}",
            data_directory.display()
        );

        Ok(Self { data_directory })
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    fn workspace_directory(&self, workspace_id: WorkspaceId) -> PathBuf {
        self.data_directory.join(workspace_id.to_string())
    }

    fn branch_directory(&self, workspace_id: WorkspaceId, branch: &str) -> PathBuf {
        let workspace_directory = self.workspace_directory(workspace_id);
        if is_main_branch(branch) {
            workspace_directory
        } else {
            workspace_directory.join(BRANCHES_DIRECTORY).join(branch)
        }
    }

    fn properties_path(&self, workspace_id: WorkspaceId) -> PathBuf {
        self.workspace_directory(workspace_id)
            .join(WORKSPACE_PROPERTIES_FILENAME)
    }

    /// Version ids stored in `dir`, newest first.
    async fn version_ids(dir: &Path) -> Result<Vec<String>> {
        let mut ids: Vec<String> = filesystem::list_directory(dir)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| version_id_from_filename(&entry.name).map(str::to_string))
            .collect();

        // fixed-width timestamps: lexicographic order is chronological order
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    async fn prune_directory(dir: &Path, max_versions: usize) {
        let ids = match Self::version_ids(dir).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list versions in {}: {}", dir.display(), e);
                return;
            }
        };

        for version_id in ids.iter().skip(max_versions) {
            let path = dir.join(version_filename(version_id));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Pruned {}", path.display()),
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }
    }
}

#[async_trait]
impl WorkspaceAdapter for ServerFileSystemWorkspaceAdapter {
    async fn workspace_ids(&self) -> Result<BTreeSet<WorkspaceId>> {
        let entries = filesystem::list_directory(&self.data_directory).await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_dir && is_numeric_name(&entry.name))
            .filter_map(|entry| entry.name.parse::<WorkspaceId>().ok())
            .filter(|id| *id > 0)
            .collect())
    }

    async fn get_workspace_metadata(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMetadata>> {
        let path = self.properties_path(workspace_id);
        let Some(content) = filesystem::read_optional(&path).await? else {
            return Ok(None);
        };

        let props = parse_properties(&content);
        Ok(Some(WorkspaceMetadata::from_properties(workspace_id, &props)))
    }

    async fn put_workspace_metadata(&self, metadata: &WorkspaceMetadata) -> Result<()> {
        let path = self.properties_path(metadata.id);
        let content = write_properties(&metadata.to_properties());

        write_atomic(&path, content.as_bytes()).await.map_err(|e| {
            error!("Could not save metadata for workspace {}: {}", metadata.id, e);
            e
        })
    }

    async fn delete_workspace(&self, workspace_id: WorkspaceId) -> Result<bool> {
        let deleted = filesystem::delete_directory(&self.workspace_directory(workspace_id)).await?;
        if deleted {
            info!("Deleted workspace {}", workspace_id);
        }
        Ok(deleted)
    }

    async fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        version: &str,
    ) -> Result<Option<String>> {
        let filename = if version.is_empty() {
            WORKSPACE_JSON_FILENAME.to_string()
        } else if is_version_id(version) {
            version_filename(version)
        } else {
            debug!("Ignoring malformed version id {:?}", version);
            return Ok(None);
        };

        let path = self.branch_directory(workspace_id, branch).join(filename);
        filesystem::read_optional(&path).await
    }

    async fn put_workspace(
        &self,
        metadata: &WorkspaceMetadata,
        json: &str,
        branch: &str,
    ) -> Result<()> {
        let dir = self.branch_directory(metadata.id, branch);

        write_atomic(&dir.join(WORKSPACE_JSON_FILENAME), json.as_bytes())
            .await
            .map_err(|e| {
                error!("Could not save workspace {}: {}", metadata.id, e);
                e
            })?;

        let version_id = format_version_id(&metadata.last_modified_date);
        let version_path = dir.join(version_filename(&version_id));
        if let Err(e) = write_atomic(&version_path, json.as_bytes()).await {
            warn!(
                "Could not write version {} of workspace {}: {}",
                version_id, metadata.id, e
            );
        }

        Ok(())
    }

    async fn workspace_versions(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        max_versions: usize,
    ) -> Vec<WorkspaceVersion> {
        let dir = self.branch_directory(workspace_id, branch);
        let ids = match Self::version_ids(&dir).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    "Could not list versions of workspace {}: {}",
                    workspace_id, e
                );
                return Vec::new();
            }
        };

        let mut versions: Vec<WorkspaceVersion> = ids
            .into_iter()
            .take(max_versions)
            .filter_map(|id| {
                let date = parse_version_id(&id)?;
                Some(WorkspaceVersion::new(id, date))
            })
            .collect();

        if let Some(latest) = versions.first_mut() {
            latest.version_id = None;
        }

        versions
    }

    async fn prune_workspace_versions(&self, workspace_id: WorkspaceId, max_versions: usize) {
        Self::prune_directory(&self.workspace_directory(workspace_id), max_versions).await;

        for branch in self.workspace_branches(workspace_id).await {
            Self::prune_directory(&self.branch_directory(workspace_id, &branch), max_versions)
                .await;
        }
    }

    async fn workspace_branches(&self, workspace_id: WorkspaceId) -> Vec<String> {
        let dir = self.workspace_directory(workspace_id).join(BRANCHES_DIRECTORY);
        let entries = match filesystem::list_directory(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Could not list branches of workspace {}: {}",
                    workspace_id, e
                );
                return Vec::new();
            }
        };

        let mut branches: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.is_dir && is_valid_branch_name(&entry.name))
            .map(|entry| entry.name)
            .collect();
        branches.sort();
        branches
    }

    async fn delete_branch(&self, workspace_id: WorkspaceId, branch: &str) -> Result<bool> {
        if is_main_branch(branch) || !is_valid_branch_name(branch) {
            return Ok(false);
        }

        filesystem::delete_directory(&self.branch_directory(workspace_id, branch)).await
    }

    async fn put_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
        source: &Path,
    ) -> Result<()> {
        filesystem::validate_image_filename(filename)?;
        let destination = self
            .branch_directory(workspace_id, branch)
            .join(IMAGES_DIRECTORY)
            .join(filename);

        filesystem::move_file(source, &destination).await
    }

    async fn get_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
    ) -> Option<ImageContent> {
        if let Err(e) = filesystem::validate_image_filename(filename) {
            warn!("{}", e);
            return None;
        }

        let path = self
            .branch_directory(workspace_id, branch)
            .join(IMAGES_DIRECTORY)
            .join(filename);
        filesystem::read_image(&path).await
    }

    async fn images(&self, workspace_id: WorkspaceId) -> Vec<Image> {
        filesystem::list_images(&self.workspace_directory(workspace_id).join(IMAGES_DIRECTORY))
            .await
    }

    async fn delete_images(&self, workspace_id: WorkspaceId) -> Result<bool> {
        filesystem::delete_images(&self.workspace_directory(workspace_id).join(IMAGES_DIRECTORY))
            .await
    }
}

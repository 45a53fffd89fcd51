use super::WorkspaceService;
use archway_core::Result;
use archway_core::workspace::{WorkspaceId, WorkspaceMetadata};
use tracing::info;
use uuid::Uuid;

impl WorkspaceService {
    pub async fn make_workspace_public(&self, workspace_id: WorkspaceId) -> Result<()> {
        self.update_metadata(workspace_id, |metadata| metadata.set_public_workspace(true))
            .await
            .map(|_| ())
    }

    pub async fn make_workspace_private(&self, workspace_id: WorkspaceId) -> Result<()> {
        self.update_metadata(workspace_id, |metadata| metadata.set_public_workspace(false))
            .await
            .map(|_| ())
    }

    /// Issues a new sharing token and returns it.
    pub async fn share_workspace(&self, workspace_id: WorkspaceId) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.update_metadata(workspace_id, |metadata| metadata.set_sharing_token(token.clone()))
            .await?;
        info!("Workspace {} shared", workspace_id);
        Ok(token)
    }

    pub async fn unshare_workspace(&self, workspace_id: WorkspaceId) -> Result<()> {
        self.update_metadata(workspace_id, |metadata| metadata.set_sharing_token(""))
            .await
            .map(|_| ())
    }

    /// Replaces the API key and secret; returns the updated metadata.
    pub async fn regenerate_api_credentials(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<WorkspaceMetadata> {
        let metadata = self
            .update_metadata(workspace_id, |metadata| {
                metadata.api_key = Some(Uuid::new_v4().to_string());
                metadata.api_secret = Some(Uuid::new_v4().to_string());
            })
            .await?;
        info!("Regenerated API credentials for workspace {}", workspace_id);
        Ok(metadata)
    }

    async fn update_metadata<F>(&self, workspace_id: WorkspaceId, update: F) -> Result<WorkspaceMetadata>
    where
        F: FnOnce(&mut WorkspaceMetadata),
    {
        let mut metadata = self.require_metadata(workspace_id).await?;
        update(&mut metadata);
        self.put_workspace_metadata(&metadata).await?;
        Ok(metadata)
    }
}

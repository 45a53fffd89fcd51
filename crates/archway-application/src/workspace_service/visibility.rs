//! Filtering workspace listings by caller identity.

use super::WorkspaceService;
use archway_core::Result;
use archway_core::user::{Permission, User};
use archway_core::workspace::{WorkspaceId, WorkspaceMetadata};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::error;

/// How a caller reaches a listed workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceAccess {
    /// Through the caller's own permissions.
    Workspace,
    /// Only because the workspace is public.
    Share,
}

impl WorkspaceAccess {
    pub fn url_prefix(&self) -> &'static str {
        match self {
            WorkspaceAccess::Workspace => "/workspace",
            WorkspaceAccess::Share => "/share",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleWorkspace {
    pub metadata: WorkspaceMetadata,
    pub access: WorkspaceAccess,
}

impl VisibleWorkspace {
    fn new(metadata: WorkspaceMetadata, access: WorkspaceAccess) -> Self {
        Self { metadata, access }
    }
}

impl WorkspaceService {
    /// Workspaces `user` may see, sorted by id.
    ///
    /// With authentication disabled everything is listed. Anonymous callers
    /// see public workspaces only. Authenticated callers see workspaces they
    /// hold any permission on, plus public ones. Listing failures are logged
    /// and produce an empty list.
    pub async fn get_workspaces_for(&self, user: Option<&User>) -> Vec<VisibleWorkspace> {
        let workspaces = match self.get_workspaces().await {
            Ok(workspaces) => workspaces,
            Err(e) => {
                error!("Could not list workspaces: {}", e);
                return Vec::new();
            }
        };

        let policy = &self.settings.access_policy;
        if !policy.authentication_enabled {
            return workspaces
                .into_iter()
                .map(|metadata| VisibleWorkspace::new(metadata, WorkspaceAccess::Workspace))
                .collect();
        }

        let user = user.filter(|user| user.is_authenticated());
        workspaces
            .into_iter()
            .filter_map(|metadata| {
                let access = match user {
                    Some(_) if !metadata.permissions(user, policy).is_empty() => {
                        WorkspaceAccess::Workspace
                    }
                    _ if metadata.is_public_workspace() => WorkspaceAccess::Share,
                    _ => return None,
                };
                Some(VisibleWorkspace::new(metadata, access))
            })
            .collect()
    }

    /// Permissions `user` holds on a workspace.
    pub async fn permissions(
        &self,
        workspace_id: WorkspaceId,
        user: Option<&User>,
    ) -> Result<BTreeSet<Permission>> {
        let metadata = self.require_metadata(workspace_id).await?;
        Ok(metadata.permissions(user, &self.settings.access_policy))
    }
}

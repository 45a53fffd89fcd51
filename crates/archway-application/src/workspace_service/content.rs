use super::WorkspaceService;
use archway_core::workspace::{
    Role, Visibility, WorkspaceBranch, WorkspaceConfiguration, WorkspaceDocument, WorkspaceId,
    WorkspaceMetadata, WorkspaceVersion, is_encrypted_envelope, is_main_branch,
    validate_branch_name,
};
use archway_core::{ArchwayError, Result};
use archway_infrastructure::{EncryptionLocation, envelope_location};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Date format used in lock messages.
const USER_FRIENDLY_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S UTC";

pub(crate) fn user_friendly_date(date: &DateTime<Utc>) -> String {
    date.format(USER_FRIENDLY_DATE_FORMAT).to_string()
}

impl WorkspaceService {
    /// Validates a branch argument and checks branch support is enabled for
    /// anything other than the main branch.
    pub(crate) fn check_branch(&self, branch: &str) -> Result<()> {
        validate_branch_name(branch)?;
        if !is_main_branch(branch) && !self.settings.branches {
            return Err(ArchwayError::validation("Branches are not enabled"));
        }
        Ok(())
    }

    /// Returns stored content, decrypting server-side envelopes.
    ///
    /// An empty `version` selects the latest content.
    pub async fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        version: &str,
    ) -> Result<String> {
        self.check_branch(branch)?;

        let Some(json) = self
            .adapter
            .get_workspace(workspace_id, branch, version)
            .await?
        else {
            if !is_main_branch(branch) {
                return Err(ArchwayError::branch_not_found(workspace_id, branch));
            }
            let id = if version.is_empty() {
                workspace_id.to_string()
            } else {
                format!("{} (version {})", workspace_id, version)
            };
            return Err(ArchwayError::not_found("Workspace", id));
        };

        if !is_encrypted_envelope(&json) {
            return Ok(json);
        }

        match envelope_location(&json) {
            Some(EncryptionLocation::Server) => match &self.encryption {
                Some(encryption) => encryption.decrypt(&json),
                None => {
                    warn!(
                        "Workspace {} is encrypted, but a passphrase has not been set",
                        workspace_id
                    );
                    Err(ArchwayError::encryption(format!(
                        "Workspace {} is encrypted on the server and no passphrase is configured",
                        workspace_id
                    )))
                }
            },
            // client-side envelopes are returned untouched
            _ => Ok(json),
        }
    }

    /// Stores new content for a workspace branch.
    ///
    /// The embedded configuration block is stripped (scope kept) and, on the
    /// main branch, harvested into the metadata. The write is refused when
    /// another editor holds the lock or the content exceeds the size ceiling.
    pub async fn put_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        json: &str,
    ) -> Result<()> {
        self.check_branch(branch)?;

        let mut metadata = self
            .get_workspace_metadata(workspace_id)
            .await?
            .unwrap_or_else(|| WorkspaceMetadata::new(workspace_id));

        let mut workspace = WorkspaceDocument::parse(json)?;
        let client_side_encrypted = is_encrypted_envelope(json);
        if !client_side_encrypted {
            for violation in self.validator.validate(&workspace)? {
                warn!("Workspace {}: {}", workspace_id, violation);
            }
        }

        let now = Utc::now();
        workspace.set_id(workspace_id);
        workspace.set_last_modified_date(&now);
        let configuration = workspace.take_configuration();

        metadata.last_modified_date = now;
        metadata.last_modified_user = workspace.last_modified_user().map(str::to_string);
        metadata.last_modified_agent = workspace.last_modified_agent().map(str::to_string);
        metadata.client_side_encrypted = client_side_encrypted;

        let stored = match (&self.encryption, client_side_encrypted) {
            (Some(encryption), false) => encryption.encrypt(&workspace)?,
            _ => workspace.to_json()?,
        };

        metadata.size = stored.len() as u64;
        let max_size = self.settings.max_workspace_size;
        if max_size > 0 && metadata.size > max_size {
            return Err(ArchwayError::too_large(workspace_id, metadata.size, max_size));
        }

        let user = workspace.last_modified_user().unwrap_or_default();
        let agent = workspace.last_modified_agent().unwrap_or_default();
        if metadata.is_locked() && !metadata.is_locked_by(user, agent) {
            let locked_date = metadata
                .locked_date()
                .map(|date| user_friendly_date(&date))
                .unwrap_or_default();
            return Err(ArchwayError::lock_conflict(format!(
                "The workspace could not be saved because the workspace was locked by {} at {}.",
                metadata.locked_user().unwrap_or_default(),
                locked_date
            )));
        }

        self.adapter
            .put_workspace(&metadata, &stored, branch)
            .await?;

        if is_main_branch(branch) {
            // metadata only follows the main branch
            if let Some(name) = workspace.name() {
                metadata.set_name(name);
            }
            if let Some(description) = workspace.description() {
                metadata.set_description(description);
            }
            self.harvest_configuration(&mut metadata, &configuration);
            self.put_workspace_metadata(&metadata).await?;
        }

        debug!(
            "Stored workspace {} ({} bytes) on branch {:?}",
            workspace_id, metadata.size, branch
        );
        Ok(())
    }

    /// Copies visibility and users from the workspace configuration into the
    /// metadata, when workspaces manage their own access.
    fn harvest_configuration(
        &self,
        metadata: &mut WorkspaceMetadata,
        configuration: &WorkspaceConfiguration,
    ) {
        let policy = &self.settings.access_policy;
        if !policy.authentication_enabled || policy.admin_users_enabled() {
            return;
        }

        if let Some(visibility) = configuration.visibility {
            metadata.set_public_workspace(visibility == Visibility::Public);
        }

        if !configuration.users.is_empty() {
            metadata.clear_write_users();
            metadata.clear_read_users();
            for user in &configuration.users {
                match user.role {
                    Role::ReadWrite => metadata.add_write_user(&user.username),
                    Role::ReadOnly => metadata.add_read_user(&user.username),
                }
            }
        }
    }

    /// Stored versions of a branch, newest first; the newest has no id.
    pub async fn get_workspace_versions(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
    ) -> Result<Vec<WorkspaceVersion>> {
        self.check_branch(branch)?;

        let mut versions = self
            .adapter
            .workspace_versions(workspace_id, branch, self.settings.max_versions)
            .await;
        versions.truncate(self.settings.max_versions);
        Ok(versions)
    }

    /// Named branches of a workspace; empty when branches are disabled.
    pub async fn get_workspace_branches(&self, workspace_id: WorkspaceId) -> Vec<WorkspaceBranch> {
        if !self.settings.branches {
            return Vec::new();
        }

        self.adapter
            .workspace_branches(workspace_id)
            .await
            .into_iter()
            .filter_map(|name| match WorkspaceBranch::new(name) {
                Ok(branch) => Some(branch),
                Err(e) => {
                    warn!("Ignoring branch of workspace {}: {}", workspace_id, e);
                    None
                }
            })
            .collect()
    }

    /// Removes a named branch; the main branch can never be deleted.
    pub async fn delete_branch(&self, workspace_id: WorkspaceId, branch: &str) -> Result<bool> {
        if is_main_branch(branch) {
            return Err(ArchwayError::validation("The main branch cannot be deleted"));
        }
        self.check_branch(branch)?;

        let deleted = self.adapter.delete_branch(workspace_id, branch).await?;
        if deleted {
            info!("Deleted branch {} of workspace {}", branch, workspace_id);
        }
        Ok(deleted)
    }
}

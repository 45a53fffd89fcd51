//! Advisory editor locks.
//!
//! A lock is held by a `(user, agent)` pair and expires `LOCK_TTL` after it
//! was last stamped. Locks do not block writes by themselves; `put_workspace`
//! refuses content from anyone but the holder.

use super::WorkspaceService;
use super::content::user_friendly_date;
use archway_core::Result;
use archway_core::workspace::WorkspaceId;
use serde::Serialize;
use tracing::{debug, error};

const LOCK_FAILED_MESSAGE: &str =
    "The workspace could not be locked - please save your workspace and refresh the page.";

/// Result of a lock attempt. Conflicts are an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockOutcome {
    pub success: bool,
    /// Human readable reason when the lock was refused.
    pub message: Option<String>,
}

impl LockOutcome {
    pub fn acquired() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl WorkspaceService {
    /// Locks a workspace for `user` editing with `agent`.
    ///
    /// Succeeds when the workspace is unlocked, the lock expired, or the same
    /// pair already holds it (the lock is restamped).
    pub async fn lock_workspace(
        &self,
        workspace_id: WorkspaceId,
        user: &str,
        agent: &str,
    ) -> Result<LockOutcome> {
        let mut metadata = self.require_metadata(workspace_id).await?;

        if metadata.is_locked() && !metadata.is_locked_by(user, agent) {
            let locked_date = metadata
                .locked_date()
                .map(|date| user_friendly_date(&date))
                .unwrap_or_default();
            return Ok(LockOutcome::refused(format!(
                "The workspace could not be locked; it was locked by {} using {} at {}.",
                metadata.locked_user().unwrap_or_default(),
                metadata.locked_agent().unwrap_or_default(),
                locked_date
            )));
        }

        metadata.add_lock(user, agent);
        match self.put_workspace_metadata(&metadata).await {
            Ok(()) => {
                debug!("Workspace {} locked by {} using {}", workspace_id, user, agent);
                Ok(LockOutcome::acquired())
            }
            Err(e) => {
                error!("Could not lock workspace {}: {}", workspace_id, e);
                Ok(LockOutcome::refused(LOCK_FAILED_MESSAGE))
            }
        }
    }

    /// Clears the lock regardless of who holds it.
    pub async fn unlock_workspace(&self, workspace_id: WorkspaceId) -> Result<bool> {
        let mut metadata = self.require_metadata(workspace_id).await?;
        metadata.clear_lock();

        match self.put_workspace_metadata(&metadata).await {
            Ok(()) => {
                debug!("Workspace {} unlocked", workspace_id);
                Ok(true)
            }
            Err(e) => {
                error!("Could not unlock workspace {}: {}", workspace_id, e);
                Ok(false)
            }
        }
    }

    /// Clears the lock only if `user` and `agent` hold it, or it expired.
    pub async fn unlock_workspace_for(
        &self,
        workspace_id: WorkspaceId,
        user: &str,
        agent: &str,
    ) -> Result<bool> {
        let metadata = self.require_metadata(workspace_id).await?;
        if metadata.is_locked() && !metadata.is_locked_by(user, agent) {
            return Ok(false);
        }
        self.unlock_workspace(workspace_id).await
    }
}

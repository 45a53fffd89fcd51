use anyhow::{Context, Result};
use archway_application::WorkspaceService;
use archway_core::user::{AuthenticationMethod, User};
use serde::Serialize;
use std::fs;
use std::path::Path;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn list(service: &WorkspaceService, archived: bool) -> Result<()> {
    let workspaces = if archived {
        service.get_archived_workspaces().await?
    } else {
        service.get_workspaces().await?
    };

    if workspaces.is_empty() {
        println!("No workspaces found");
        return Ok(());
    }

    for metadata in workspaces {
        let lock = match metadata.locked_user() {
            Some(user) if metadata.is_locked() => format!("  [locked by {}]", user),
            _ => String::new(),
        };
        println!(
            "{:>5}  {}  {}{}",
            metadata.id,
            metadata.last_modified_date.format("%Y-%m-%d %H:%M:%S"),
            metadata.name(),
            lock
        );
    }
    Ok(())
}

pub async fn create(service: &WorkspaceService, owner: Option<String>) -> Result<()> {
    let user = owner.map(|name| User::new(name, Vec::<String>::new(), AuthenticationMethod::Local));
    let workspace_id = service.create_workspace(user.as_ref()).await?;
    println!("✅ Created workspace {}", workspace_id);
    Ok(())
}

pub async fn show(
    service: &WorkspaceService,
    workspace_id: u64,
    branch: &str,
    version: &str,
) -> Result<()> {
    let json = service.get_workspace(workspace_id, branch, version).await?;
    let value: serde_json::Value =
        serde_json::from_str(&json).context("Stored workspace is not valid JSON")?;
    print_json(&value)
}

pub async fn put(
    service: &WorkspaceService,
    workspace_id: u64,
    file: &Path,
    branch: &str,
) -> Result<()> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    service.put_workspace(workspace_id, branch, &json).await?;
    println!("✅ Saved workspace {}", workspace_id);
    Ok(())
}

pub async fn versions(service: &WorkspaceService, workspace_id: u64, branch: &str) -> Result<()> {
    let versions = service.get_workspace_versions(workspace_id, branch).await?;
    print_json(&versions)
}

pub async fn branches(service: &WorkspaceService, workspace_id: u64) -> Result<()> {
    let branches = service.get_workspace_branches(workspace_id).await;
    print_json(&branches)
}

pub async fn lock(
    service: &WorkspaceService,
    workspace_id: u64,
    user: &str,
    agent: &str,
) -> Result<()> {
    let outcome = service.lock_workspace(workspace_id, user, agent).await?;
    print_json(&outcome)?;
    if !outcome.success {
        anyhow::bail!("Workspace {} is not locked", workspace_id);
    }
    Ok(())
}

pub async fn unlock(service: &WorkspaceService, workspace_id: u64) -> Result<()> {
    if service.unlock_workspace(workspace_id).await? {
        println!("🔓 Workspace {} unlocked", workspace_id);
        Ok(())
    } else {
        anyhow::bail!("Workspace {} could not be unlocked", workspace_id)
    }
}

pub async fn delete(service: &WorkspaceService, workspace_id: u64) -> Result<()> {
    if service.delete_workspace(workspace_id).await? {
        println!("🗑  Workspace {} deleted", workspace_id);
    } else {
        println!("Workspace {} was not deleted", workspace_id);
    }
    Ok(())
}

pub async fn prune(service: &WorkspaceService) -> Result<()> {
    service.remove_old_workspace_versions().await;
    println!(
        "✅ Kept at most {} versions per workspace",
        service.settings().max_versions
    );
    Ok(())
}

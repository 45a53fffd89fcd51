use archway_application::{ServiceSettings, WorkspaceAccess, WorkspaceService};
use archway_core::collaborator::{ScopeValidation, SearchIndexer};
use archway_core::user::{AccessPolicy, AuthenticationMethod, Permission, User};
use archway_core::workspace::{
    Image, ImageContent, WorkspaceAdapter, WorkspaceId, WorkspaceMetadata, WorkspaceVersion,
};
use archway_core::{ArchwayError, Result};
use archway_infrastructure::{
    AesEncryptionStrategy, InMemoryWorkspaceMetadataCache, NoOpWorkspaceMetadataCache,
    ServerFileSystemWorkspaceAdapter,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn service_with(temp_dir: &TempDir, settings: ServiceSettings) -> WorkspaceService {
    let adapter = ServerFileSystemWorkspaceAdapter::new(temp_dir.path()).unwrap();
    WorkspaceService::new(
        Arc::new(adapter),
        Arc::new(NoOpWorkspaceMetadataCache),
        settings,
    )
}

fn service(temp_dir: &TempDir) -> WorkspaceService {
    service_with(temp_dir, ServiceSettings::default())
}

fn authenticated(username: &str) -> User {
    User::new(username, Vec::<String>::new(), AuthenticationMethod::Local)
}

fn pause() {
    // version ids have millisecond resolution
    std::thread::sleep(std::time::Duration::from_millis(5));
}

#[tokio::test]
async fn test_sequential_ids() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);

    for expected in 1..=3 {
        assert_eq!(service.create_workspace(None).await.unwrap(), expected);
    }

    let workspaces = service.get_workspaces().await.unwrap();
    let ids: Vec<WorkspaceId> = workspaces.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(workspaces[0].name(), "Workspace 0001");
    assert_eq!(workspaces[0].description(), "Description");
    assert!(workspaces[0].api_key.is_some());
    assert_ne!(workspaces[0].api_key, workspaces[1].api_key);
}

#[tokio::test]
async fn test_create_records_owner() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);

    let id = service
        .create_workspace(Some(&authenticated("alice")))
        .await
        .unwrap();
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.owner.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_end_to_end_versions() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);

    let id = service.create_workspace(None).await.unwrap();
    assert_eq!(id, 1);

    pause();
    service
        .put_workspace(id, "", r#"{"name":"json-1","model":{}}"#)
        .await
        .unwrap();
    let versions = service.get_workspace_versions(id, "").await.unwrap();
    assert!(versions[0].version_id.is_none());
    assert!(
        service
            .get_workspace(id, "", "")
            .await
            .unwrap()
            .contains(r#""name":"json-1""#)
    );

    pause();
    service
        .put_workspace(id, "", r#"{"name":"json-2","model":{}}"#)
        .await
        .unwrap();

    let versions = service.get_workspace_versions(id, "").await.unwrap();
    assert_eq!(versions.len(), 3);
    assert!(versions[0].version_id.is_none());
    assert!(versions[0].last_modified_date > versions[1].last_modified_date);

    let latest = service.get_workspace(id, "", "").await.unwrap();
    assert!(latest.contains(r#""name":"json-2""#));

    let previous = versions[1].version_id.clone().unwrap();
    let content = service.get_workspace(id, "", &previous).await.unwrap();
    assert!(content.contains(r#""name":"json-1""#));

    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.name(), "json-2");
}

#[tokio::test]
async fn test_put_stamps_id_and_strips_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    service
        .put_workspace(
            id,
            "",
            r#"{"id":99,"name":"Bank","configuration":{"scope":"SoftwareSystem","visibility":"Public"}}"#,
        )
        .await
        .unwrap();

    let json = service.get_workspace(id, "", "").await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["id"], 1);
    assert_eq!(value["configuration"]["scope"], "SoftwareSystem");
    assert!(value["configuration"].get("visibility").is_none());
    assert!(value["lastModifiedDate"].is_string());
}

#[tokio::test]
async fn test_missing_content() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);

    let err = service.get_workspace(7, "", "").await.unwrap_err();
    assert!(err.is_not_found());

    let id = service.create_workspace(None).await.unwrap();
    let err = service
        .get_workspace(id, "", "20000101000000000")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_lock_state_machine() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    assert!(service.lock_workspace(id, "alice", "web").await.unwrap().success);
    // same holder refreshes
    assert!(service.lock_workspace(id, "alice", "web").await.unwrap().success);

    let refused = service.lock_workspace(id, "bob", "cli").await.unwrap();
    assert!(!refused.success);
    let message = refused.message.unwrap();
    assert!(
        message.starts_with("The workspace could not be locked; it was locked by alice using web at "),
        "{}",
        message
    );

    // same user, different agent is a different holder
    assert!(!service.lock_workspace(id, "alice", "cli").await.unwrap().success);

    // let the lock expire
    let mut metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    metadata.add_lock_at("alice", "web", Utc::now() - Duration::minutes(3));
    service.put_workspace_metadata(&metadata).await.unwrap();

    assert!(service.lock_workspace(id, "bob", "cli").await.unwrap().success);
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(metadata.is_locked_by("bob", "cli"));
}

#[tokio::test]
async fn test_unlock() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    service.lock_workspace(id, "alice", "web").await.unwrap();
    assert!(!service.unlock_workspace_for(id, "bob", "web").await.unwrap());
    assert!(
        service
            .get_workspace_metadata(id)
            .await
            .unwrap()
            .unwrap()
            .is_locked()
    );

    assert!(service.unlock_workspace_for(id, "alice", "web").await.unwrap());
    assert!(
        !service
            .get_workspace_metadata(id)
            .await
            .unwrap()
            .unwrap()
            .is_locked()
    );

    service.lock_workspace(id, "alice", "web").await.unwrap();
    assert!(service.unlock_workspace(id).await.unwrap());
    assert!(service.lock_workspace(id, "bob", "cli").await.unwrap().success);

    assert!(service.unlock_workspace(42).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_put_refused_while_locked_by_someone_else() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();
    service.lock_workspace(id, "alice", "web").await.unwrap();

    let err = service
        .put_workspace(
            id,
            "",
            r#"{"name":"x","lastModifiedUser":"bob","lastModifiedAgent":"web"}"#,
        )
        .await
        .unwrap_err();
    assert!(err.is_lock_conflict());
    assert!(
        err.to_string()
            .starts_with("The workspace could not be saved because the workspace was locked by alice at "),
        "{}",
        err
    );

    service
        .put_workspace(
            id,
            "",
            r#"{"name":"y","lastModifiedUser":"alice","lastModifiedAgent":"web"}"#,
        )
        .await
        .unwrap();
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.last_modified_user.as_deref(), Some("alice"));
    assert_eq!(metadata.name(), "y");
}

#[tokio::test]
async fn test_size_ceiling() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        max_workspace_size: 1_000,
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let id = service.create_workspace(None).await.unwrap();

    let json = format!(r#"{{"name":"big","description":"{}"}}"#, "x".repeat(2_000));
    let err = service.put_workspace(id, "", &json).await.unwrap_err();
    assert!(err.is_too_large());
    assert!(
        err.to_string()
            .ends_with("MB, which exceeds the maximum size of 0.001 MB")
    );

    // unchanged
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.name(), "Workspace 0001");
    assert!(metadata.size > 0 && metadata.size < 1_000);
}

#[tokio::test]
async fn test_server_side_encryption() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir)
        .with_encryption(AesEncryptionStrategy::new("secret", 100).unwrap());
    let id = service.create_workspace(None).await.unwrap();

    service
        .put_workspace(id, "", r#"{"name":"Bank","model":{"marker":"top-secret"}}"#)
        .await
        .unwrap();

    let raw = std::fs::read_to_string(temp_dir.path().join("1").join("workspace.json")).unwrap();
    assert!(raw.contains("\"ciphertext\""));
    assert!(!raw.contains("top-secret"));

    let json = service.get_workspace(id, "", "").await.unwrap();
    assert!(json.contains("top-secret"));

    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(!metadata.client_side_encrypted);

    // the same store without the passphrase cannot decrypt
    let without_passphrase = service_with(&temp_dir, ServiceSettings::default());
    let err = without_passphrase.get_workspace(id, "", "").await.unwrap_err();
    assert!(matches!(err, ArchwayError::Encryption(_)));
}

#[tokio::test]
async fn test_client_side_envelope_passes_through() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir)
        .with_encryption(AesEncryptionStrategy::new("secret", 100).unwrap());
    let id = service.create_workspace(None).await.unwrap();

    let envelope = r#"{"name":"Encrypted","configuration":{"scope":"Landscape","visibility":"Public"},"encryptionStrategy":{"type":"aes","location":"Client","keySize":128},"ciphertext":"opaque"}"#;
    service.put_workspace(id, "", envelope).await.unwrap();

    let json = service.get_workspace(id, "", "").await.unwrap();
    assert!(json.contains(r#""ciphertext":"opaque""#));
    assert!(json.contains(r#""scope":"Landscape""#));
    assert!(!json.contains("visibility"));

    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(metadata.client_side_encrypted);
    assert_eq!(metadata.name(), "Encrypted");
}

#[tokio::test]
async fn test_visibility_filtering() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        access_policy: AccessPolicy::new(true, Vec::<String>::new()),
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);

    let public = service.create_workspace(None).await.unwrap();
    let restricted = service.create_workspace(None).await.unwrap();
    let open = service.create_workspace(None).await.unwrap();

    service
        .put_workspace(
            public,
            "",
            r#"{"name":"Public","configuration":{"visibility":"Public","users":[{"username":"carol","role":"ReadOnly"}]}}"#,
        )
        .await
        .unwrap();
    service
        .put_workspace(
            restricted,
            "",
            r#"{"name":"Restricted","configuration":{"users":[{"username":"Alice","role":"ReadWrite"},{"username":"dave","role":"ReadOnly"}]}}"#,
        )
        .await
        .unwrap();

    let metadata = service.get_workspace_metadata(restricted).await.unwrap().unwrap();
    assert!(metadata.write_users().contains("alice"));
    assert!(metadata.read_users().contains("dave"));

    let anonymous = service.get_workspaces_for(None).await;
    assert_eq!(anonymous.len(), 1);
    assert_eq!(anonymous[0].metadata.id, public);
    assert_eq!(anonymous[0].access, WorkspaceAccess::Share);
    assert_eq!(anonymous[0].access.url_prefix(), "/share");

    let alice = authenticated("alice");
    let visible: Vec<(WorkspaceId, WorkspaceAccess)> = service
        .get_workspaces_for(Some(&alice))
        .await
        .into_iter()
        .map(|w| (w.metadata.id, w.access))
        .collect();
    assert_eq!(
        visible,
        vec![
            (public, WorkspaceAccess::Share),
            (restricted, WorkspaceAccess::Workspace),
            (open, WorkspaceAccess::Workspace),
        ]
    );

    let bob = authenticated("bob");
    let visible: Vec<WorkspaceId> = service
        .get_workspaces_for(Some(&bob))
        .await
        .into_iter()
        .map(|w| w.metadata.id)
        .collect();
    assert_eq!(visible, vec![public, open]);

    let permissions = service.permissions(restricted, Some(&authenticated("dave"))).await.unwrap();
    assert_eq!(permissions, BTreeSet::from([Permission::Read]));
}

#[tokio::test]
async fn test_configuration_not_harvested_with_admin_list() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        access_policy: AccessPolicy::new(true, ["admin"]),
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let id = service.create_workspace(None).await.unwrap();

    service
        .put_workspace(
            id,
            "",
            r#"{"name":"W","configuration":{"visibility":"Public","users":[{"username":"alice","role":"ReadWrite"}]}}"#,
        )
        .await
        .unwrap();

    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(!metadata.is_public_workspace());
    assert!(metadata.has_no_users_configured());
}

#[tokio::test]
async fn test_everything_visible_without_authentication() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    service.create_workspace(None).await.unwrap();
    service.create_workspace(None).await.unwrap();

    let visible = service.get_workspaces_for(None).await;
    assert_eq!(visible.len(), 2);
    assert!(
        visible
            .iter()
            .all(|w| w.access == WorkspaceAccess::Workspace)
    );
}

#[tokio::test]
async fn test_archiving() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        archiving: true,
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let first = service.create_workspace(None).await.unwrap();
    let second = service.create_workspace(None).await.unwrap();

    assert!(service.delete_workspace(first).await.unwrap());
    assert!(temp_dir.path().join("1").is_dir());

    let live: Vec<WorkspaceId> = service
        .get_workspaces()
        .await
        .unwrap()
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(live, vec![second]);

    let archived = service.get_archived_workspaces().await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id, first);
    assert!(service.get_workspace_metadata(first).await.unwrap().is_none());

    // archived ids are not reused
    assert_eq!(service.create_workspace(None).await.unwrap(), 3);
}

#[derive(Default)]
struct RecordingIndexer {
    deleted: Mutex<Vec<WorkspaceId>>,
}

impl SearchIndexer for RecordingIndexer {
    fn delete(&self, workspace_id: WorkspaceId) {
        self.deleted.lock().unwrap().push(workspace_id);
    }
}

#[tokio::test]
async fn test_hard_delete_notifies_indexer() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = Arc::new(RecordingIndexer::default());
    let service = service(&temp_dir).with_search_indexer(indexer.clone());
    let id = service.create_workspace(None).await.unwrap();

    assert!(service.delete_workspace(id).await.unwrap());
    assert!(!temp_dir.path().join("1").exists());
    assert!(!service.delete_workspace(id).await.unwrap());
    assert_eq!(*indexer.deleted.lock().unwrap(), vec![id]);
}

#[tokio::test]
async fn test_branches() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        branches: true,
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let id = service.create_workspace(None).await.unwrap();
    assert!(service.get_workspace_branches(id).await.is_empty());

    service
        .put_workspace(id, "b2", r#"{"name":"on b2"}"#)
        .await
        .unwrap();
    service
        .put_workspace(id, "b1", r#"{"name":"on b1"}"#)
        .await
        .unwrap();

    let names: Vec<String> = service
        .get_workspace_branches(id)
        .await
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["b1", "b2"]);

    assert!(
        service
            .get_workspace(id, "b1", "")
            .await
            .unwrap()
            .contains("on b1")
    );
    // branch writes leave the main metadata alone
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.name(), "Workspace 0001");

    let err = service.get_workspace(id, "b3", "").await.unwrap_err();
    assert!(err.is_branch_not_found());

    assert!(service.delete_branch(id, "main").await.unwrap_err().is_validation());
    assert!(service.delete_branch(id, "").await.unwrap_err().is_validation());
    assert!(!service.delete_branch(id, "nonexistent").await.unwrap());
    assert!(service.delete_branch(id, "b1").await.unwrap());

    let names: Vec<String> = service
        .get_workspace_branches(id)
        .await
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["b2"]);
}

#[tokio::test]
async fn test_branch_rules() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    // disabled by default
    let err = service
        .put_workspace(id, "b1", r#"{"name":"x"}"#)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(!temp_dir.path().join("1").join("branches").exists());

    let err = service
        .put_workspace(id, "../escape", r#"{"name":"x"}"#)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // "main" is the primary line
    service
        .put_workspace(id, "MAIN", r#"{"name":"main"}"#)
        .await
        .unwrap();
    assert!(
        service
            .get_workspace(id, "", "")
            .await
            .unwrap()
            .contains(r#""name":"main""#)
    );
}

#[tokio::test]
async fn test_sharing() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    service.make_workspace_public(id).await.unwrap();
    assert!(
        service
            .get_workspace_metadata(id)
            .await
            .unwrap()
            .unwrap()
            .is_public_workspace()
    );

    let token = service.share_workspace(id).await.unwrap();
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert_eq!(metadata.sharing_token(), Some(token.as_str()));
    assert!(!metadata.is_public_workspace());

    service.unshare_workspace(id).await.unwrap();
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(metadata.sharing_token().is_none());

    service.make_workspace_public(id).await.unwrap();
    service.make_workspace_private(id).await.unwrap();
    assert!(
        !service
            .get_workspace_metadata(id)
            .await
            .unwrap()
            .unwrap()
            .is_public_workspace()
    );
}

#[tokio::test]
async fn test_regenerate_api_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    let before = service.get_workspace_metadata(id).await.unwrap().unwrap();
    let after = service.regenerate_api_credentials(id).await.unwrap();
    assert_ne!(before.api_key, after.api_key);
    assert_ne!(before.api_secret, after.api_secret);
    assert_eq!(
        service.get_workspace_metadata(id).await.unwrap().unwrap().api_key,
        after.api_key
    );
}

#[tokio::test]
async fn test_strict_scope_validation() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        scope_validation: ScopeValidation::Strict,
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let id = service.create_workspace(None).await.unwrap();

    let json = service.get_workspace(id, "", "").await.unwrap();
    assert!(json.contains(r#""scope":"SoftwareSystem""#));

    let err = service
        .put_workspace(id, "", r#"{"name":"unscoped"}"#)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_images() {
    let temp_dir = TempDir::new().unwrap();
    let service = service(&temp_dir);
    let id = service.create_workspace(None).await.unwrap();

    let upload = TempDir::new().unwrap();
    let source = upload.path().join("upload.png");
    std::fs::write(&source, b"png-bytes").unwrap();

    let err = service
        .put_image(id, "", "notes.txt", &source)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    service.put_image(id, "", "diagram.png", &source).await.unwrap();
    assert!(!source.exists());

    let images = service.get_images(id).await;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].name, "diagram.png");

    let content = service.get_image(id, "", "diagram.png").await.unwrap();
    assert_eq!(content.bytes, b"png-bytes");
    assert_eq!(content.content_type, "image/png");
    assert!(service.get_image(id, "", "missing.png").await.is_none());

    assert!(service.delete_images(id).await.unwrap());
    assert!(service.get_images(id).await.is_empty());
}

#[tokio::test]
async fn test_remove_old_workspace_versions() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ServiceSettings {
        max_versions: 2,
        ..ServiceSettings::default()
    };
    let service = service_with(&temp_dir, settings);
    let id = service.create_workspace(None).await.unwrap();
    for n in 0..4 {
        pause();
        service
            .put_workspace(id, "", &format!(r#"{{"name":"v{}"}}"#, n))
            .await
            .unwrap();
    }

    let version_files = || {
        std::fs::read_dir(temp_dir.path().join("1"))
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with("workspace-"))
            .count()
    };
    assert_eq!(version_files(), 5);

    service.remove_old_workspace_versions().await;
    assert_eq!(version_files(), 2);
    assert!(
        service
            .get_workspace(id, "", "")
            .await
            .unwrap()
            .contains(r#""name":"v3""#)
    );
}

#[tokio::test]
async fn test_metadata_cache_is_written_through() {
    let temp_dir = TempDir::new().unwrap();
    let adapter = ServerFileSystemWorkspaceAdapter::new(temp_dir.path()).unwrap();
    let service = WorkspaceService::new(
        Arc::new(adapter),
        Arc::new(InMemoryWorkspaceMetadataCache::with_expiry_minutes(5)),
        ServiceSettings::default(),
    );
    let id = service.create_workspace(None).await.unwrap();
    service.lock_workspace(id, "alice", "web").await.unwrap();

    // served from the cache once the file is gone
    std::fs::remove_file(temp_dir.path().join("1").join("workspace.properties")).unwrap();
    let metadata = service.get_workspace_metadata(id).await.unwrap().unwrap();
    assert!(metadata.is_locked_by("alice", "web"));

    service.shutdown().await;
}

/// Delegates to a real adapter but fails metadata reads for one id.
struct FlakyAdapter {
    inner: ServerFileSystemWorkspaceAdapter,
    failing_id: WorkspaceId,
}

#[async_trait]
impl WorkspaceAdapter for FlakyAdapter {
    async fn workspace_ids(&self) -> Result<BTreeSet<WorkspaceId>> {
        self.inner.workspace_ids().await
    }

    async fn get_workspace_metadata(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMetadata>> {
        if workspace_id == self.failing_id {
            return Err(ArchwayError::io("disk on fire"));
        }
        self.inner.get_workspace_metadata(workspace_id).await
    }

    async fn put_workspace_metadata(&self, metadata: &WorkspaceMetadata) -> Result<()> {
        self.inner.put_workspace_metadata(metadata).await
    }

    async fn delete_workspace(&self, workspace_id: WorkspaceId) -> Result<bool> {
        self.inner.delete_workspace(workspace_id).await
    }

    async fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        version: &str,
    ) -> Result<Option<String>> {
        self.inner.get_workspace(workspace_id, branch, version).await
    }

    async fn put_workspace(
        &self,
        metadata: &WorkspaceMetadata,
        json: &str,
        branch: &str,
    ) -> Result<()> {
        self.inner.put_workspace(metadata, json, branch).await
    }

    async fn workspace_versions(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        max_versions: usize,
    ) -> Vec<WorkspaceVersion> {
        self.inner
            .workspace_versions(workspace_id, branch, max_versions)
            .await
    }

    async fn prune_workspace_versions(&self, workspace_id: WorkspaceId, max_versions: usize) {
        self.inner
            .prune_workspace_versions(workspace_id, max_versions)
            .await
    }

    async fn workspace_branches(&self, workspace_id: WorkspaceId) -> Vec<String> {
        self.inner.workspace_branches(workspace_id).await
    }

    async fn delete_branch(&self, workspace_id: WorkspaceId, branch: &str) -> Result<bool> {
        self.inner.delete_branch(workspace_id, branch).await
    }

    async fn put_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
        source: &Path,
    ) -> Result<()> {
        self.inner
            .put_image(workspace_id, branch, filename, source)
            .await
    }

    async fn get_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
    ) -> Option<ImageContent> {
        self.inner.get_image(workspace_id, branch, filename).await
    }

    async fn images(&self, workspace_id: WorkspaceId) -> Vec<Image> {
        self.inner.images(workspace_id).await
    }

    async fn delete_images(&self, workspace_id: WorkspaceId) -> Result<bool> {
        self.inner.delete_images(workspace_id).await
    }
}

#[tokio::test]
async fn test_listing_omits_failed_workspaces() {
    let temp_dir = TempDir::new().unwrap();
    {
        let setup = service(&temp_dir);
        for _ in 0..3 {
            setup.create_workspace(None).await.unwrap();
        }
    }

    let adapter = FlakyAdapter {
        inner: ServerFileSystemWorkspaceAdapter::new(temp_dir.path()).unwrap(),
        failing_id: 2,
    };
    let settings = ServiceSettings {
        threads: 2,
        ..ServiceSettings::default()
    };
    let service = WorkspaceService::new(
        Arc::new(adapter),
        Arc::new(NoOpWorkspaceMetadataCache),
        settings,
    );

    let ids: Vec<WorkspaceId> = service
        .get_workspaces()
        .await
        .unwrap()
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

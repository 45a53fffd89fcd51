//! Local DSL-authoring stores.
//!
//! A local workspace directory holds `workspace.dsl` and/or `workspace.json`
//! and has no version history, branches or separate metadata store. The DSL
//! file is the authoring source; a `workspace.json` written after the last
//! scan is served as is, otherwise the DSL is recompiled.

use crate::scanner::StalenessScanner;
use crate::storage::filesystem::{
    self, IMAGES_DIRECTORY, WORKSPACE_DSL_FILENAME, WORKSPACE_JSON_FILENAME, modified_millis,
};
use crate::storage::write_atomic;
use archway_core::collaborator::{DslParser, WorkspaceValidator};
use archway_core::workspace::{
    Image, ImageContent, WorkspaceAdapter, WorkspaceDocument, WorkspaceId, WorkspaceMetadata,
    WorkspaceVersion, is_main_branch, parse_workspace_id,
};
use archway_core::{ArchwayError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Id reported by the single-workspace layout.
pub const SINGLE_WORKSPACE_ID: WorkspaceId = 1;

const DSL_TEMPLATE: &str = r#"workspace "Name" "Description" {

    !identifiers hierarchical

    model {
        u = person "User"
        ss = softwareSystem "Software System"

        u -> ss "Uses"
    }

    views {
        systemContext ss "Diagram1" {
            include *
            autolayout lr
        }

        styles {
            element "Element" {
                color #ffffff
            }
            element "Person" {
                background #d34407
                shape person
            }
            element "Software System" {
                background #f86628
            }
        }
    }

    configuration {
        scope softwaresystem
    }

}
"#;

/// Where local workspaces live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalLayout {
    /// One workspace, id 1, stored directly in the directory.
    Single { directory: PathBuf },
    /// One sub-directory per workspace, named `<id>` or `<id>-<suffix>`.
    Multiple { root: PathBuf },
}

impl LocalLayout {
    /// Directory watched by the staleness scanner.
    pub fn scan_root(&self) -> &Path {
        match self {
            LocalLayout::Single { directory } => directory,
            LocalLayout::Multiple { root } => root,
        }
    }

    async fn workspace_ids(&self) -> Result<BTreeSet<WorkspaceId>> {
        match self {
            LocalLayout::Single { .. } => Ok(BTreeSet::from([SINGLE_WORKSPACE_ID])),
            LocalLayout::Multiple { root } => Ok(filesystem::list_directory(root)
                .await?
                .into_iter()
                .filter(|entry| entry.is_dir)
                .map(|entry| parse_workspace_id(&entry.name))
                .filter(|id| *id > 0)
                .collect()),
        }
    }

    /// Resolves the directory of a workspace.
    ///
    /// In the multiple layout `<root>/<id>` wins; otherwise the first
    /// directory whose leading digits equal the id is used.
    async fn workspace_directory(&self, workspace_id: WorkspaceId) -> Option<PathBuf> {
        match self {
            LocalLayout::Single { directory } => {
                (workspace_id == SINGLE_WORKSPACE_ID).then(|| directory.clone())
            }
            LocalLayout::Multiple { root } => {
                let exact = root.join(workspace_id.to_string());
                if exact.is_dir() {
                    return Some(exact);
                }

                let mut entries = filesystem::list_directory(root).await.ok()?;
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                entries
                    .into_iter()
                    .find(|entry| entry.is_dir && parse_workspace_id(&entry.name) == workspace_id)
                    .map(|entry| root.join(entry.name))
            }
        }
    }

    /// Directory a new workspace would be written to.
    async fn writable_directory(&self, workspace_id: WorkspaceId) -> Result<PathBuf> {
        if let Some(dir) = self.workspace_directory(workspace_id).await {
            return Ok(dir);
        }

        match self {
            LocalLayout::Single { .. } => Err(ArchwayError::validation(format!(
                "Only workspace {} can be stored in single workspace mode",
                SINGLE_WORKSPACE_ID
            ))),
            LocalLayout::Multiple { root } => Ok(root.join(workspace_id.to_string())),
        }
    }
}

/// File-system adapter for local DSL authoring.
///
/// API credentials are generated when the adapter is constructed and kept in
/// memory only, so they change every time the process starts.
pub struct LocalFileSystemWorkspaceAdapter {
    layout: LocalLayout,
    parser: Arc<dyn DslParser>,
    validator: Arc<dyn WorkspaceValidator>,
    scanner: StalenessScanner,
    api_key: String,
    api_secret: String,
}

impl LocalFileSystemWorkspaceAdapter {
    /// Single workspace stored directly in `directory`.
    ///
    /// Writes a DSL template when the directory holds neither a DSL nor a
    /// JSON workspace. Must be called from within a Tokio runtime.
    pub fn single(
        directory: impl Into<PathBuf>,
        parser: Arc<dyn DslParser>,
        validator: Arc<dyn WorkspaceValidator>,
    ) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| ArchwayError::io_at(&directory, e))?;

        let dsl_path = directory.join(WORKSPACE_DSL_FILENAME);
        if !dsl_path.exists() && !directory.join(WORKSPACE_JSON_FILENAME).exists() {
            info!("Creating workspace template at {}", dsl_path.display());
            std::fs::write(&dsl_path, DSL_TEMPLATE).map_err(|e| ArchwayError::io_at(&dsl_path, e))?;
        }

        Ok(Self::with_layout(
            LocalLayout::Single { directory },
            parser,
            validator,
        ))
    }

    /// One sub-directory per workspace under `root`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn multiple(
        root: impl Into<PathBuf>,
        parser: Arc<dyn DslParser>,
        validator: Arc<dyn WorkspaceValidator>,
    ) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| ArchwayError::io_at(&root, e))?;

        Ok(Self::with_layout(
            LocalLayout::Multiple { root },
            parser,
            validator,
        ))
    }

    fn with_layout(
        layout: LocalLayout,
        parser: Arc<dyn DslParser>,
        validator: Arc<dyn WorkspaceValidator>,
    ) -> Self {
        info!(
            "Using local workspace storage at {}",
            layout.scan_root().display()
        );
        let scanner = StalenessScanner::start(layout.scan_root());

        Self {
            layout,
            parser,
            validator,
            scanner,
            api_key: Uuid::new_v4().to_string(),
            api_secret: Uuid::new_v4().to_string(),
        }
    }

    pub fn layout(&self) -> &LocalLayout {
        &self.layout
    }

    pub fn scanner(&self) -> &StalenessScanner {
        &self.scanner
    }

    fn validate(&self, workspace_id: WorkspaceId, workspace: &WorkspaceDocument) -> Result<()> {
        let violations = self.validator.validate(workspace)?;
        for violation in violations {
            warn!("Workspace {}: {}", workspace_id, violation);
        }
        Ok(())
    }

    /// Loads the current JSON of a workspace, reconciling it with its DSL
    /// source first.
    async fn load_workspace(&self, workspace_id: WorkspaceId) -> Result<String> {
        let dir = self
            .layout
            .workspace_directory(workspace_id)
            .await
            .ok_or_else(|| ArchwayError::not_found("Workspace", workspace_id.to_string()))?;

        let json_path = dir.join(WORKSPACE_JSON_FILENAME);
        let dsl_path = dir.join(WORKSPACE_DSL_FILENAME);
        let json_exists = json_path.is_file();
        let dsl_exists = dsl_path.is_file();

        if json_exists {
            let last_scan = self.scanner.last_modified();
            if modified_millis(&json_path).is_some_and(|modified| modified > last_scan) {
                debug!(
                    "Workspace {}: JSON is newer than the last scan, using it",
                    workspace_id
                );
                if let Some(json) = filesystem::read_optional(&json_path).await? {
                    return Ok(json);
                }
            }
        }

        if dsl_exists {
            self.compile_dsl(workspace_id, &dsl_path, &json_path).await
        } else if json_exists {
            self.load_json(workspace_id, &json_path, &dsl_path).await
        } else {
            Err(ArchwayError::not_found("Workspace", workspace_id.to_string()))
        }
    }

    async fn compile_dsl(
        &self,
        workspace_id: WorkspaceId,
        dsl_path: &Path,
        json_path: &Path,
    ) -> Result<String> {
        debug!("Workspace {}: parsing {}", workspace_id, dsl_path.display());
        let source = filesystem::read_optional(dsl_path)
            .await?
            .ok_or_else(|| ArchwayError::not_found("Workspace", workspace_id.to_string()))?;

        let previous = match filesystem::read_optional(json_path).await {
            Ok(Some(json)) => WorkspaceDocument::parse(&json).ok(),
            _ => None,
        };

        let mut workspace = self.parser.parse(&source, dsl_path, previous.as_ref())?;
        self.validate(workspace_id, &workspace)?;

        workspace.set_id(workspace_id);
        workspace.set_last_modified_date(&Utc::now());
        let json = workspace.to_json()?;

        if let Err(e) = write_atomic(json_path, json.as_bytes()).await {
            warn!(
                "Could not write compiled workspace {} to {}: {}",
                workspace_id,
                json_path.display(),
                e
            );
        }

        Ok(json)
    }

    async fn load_json(
        &self,
        workspace_id: WorkspaceId,
        json_path: &Path,
        dsl_path: &Path,
    ) -> Result<String> {
        let json = filesystem::read_optional(json_path)
            .await?
            .ok_or_else(|| ArchwayError::not_found("Workspace", workspace_id.to_string()))?;

        let workspace = WorkspaceDocument::parse(&json)?;
        self.validate(workspace_id, &workspace)?;

        if let Some(dsl) = workspace.embedded_dsl() {
            info!(
                "Workspace {}: extracting embedded DSL to {}",
                workspace_id,
                dsl_path.display()
            );
            if let Err(e) = write_atomic(dsl_path, dsl.as_bytes()).await {
                warn!("Could not write {}: {}", dsl_path.display(), e);
            }
        }

        Ok(json)
    }

    async fn images_directory(&self, workspace_id: WorkspaceId, branch: &str) -> Option<PathBuf> {
        if !is_main_branch(branch) {
            return None;
        }
        self.layout
            .workspace_directory(workspace_id)
            .await
            .map(|dir| dir.join(IMAGES_DIRECTORY))
    }
}

fn branches_unsupported() -> ArchwayError {
    ArchwayError::validation("Branches are not supported by local workspace storage")
}

#[async_trait]
impl WorkspaceAdapter for LocalFileSystemWorkspaceAdapter {
    async fn workspace_ids(&self) -> Result<BTreeSet<WorkspaceId>> {
        self.layout.workspace_ids().await
    }

    async fn get_workspace_metadata(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<WorkspaceMetadata>> {
        if self.layout.workspace_directory(workspace_id).await.is_none() {
            return Ok(None);
        }

        let mut metadata = WorkspaceMetadata::new(workspace_id);
        metadata.api_key = Some(self.api_key.clone());
        metadata.api_secret = Some(self.api_secret.clone());

        match self.load_workspace(workspace_id).await {
            Ok(json) => {
                metadata.size = json.len() as u64;
                if let Ok(workspace) = WorkspaceDocument::parse(&json) {
                    if let Some(name) = workspace.name() {
                        metadata.set_name(name);
                    }
                    if let Some(description) = workspace.description() {
                        metadata.set_description(description);
                    }
                    if let Some(date) = workspace.last_modified_date() {
                        metadata.last_modified_date = date;
                    }
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("Could not load workspace {}: {}", workspace_id, e),
        }

        Ok(Some(metadata))
    }

    async fn put_workspace_metadata(&self, metadata: &WorkspaceMetadata) -> Result<()> {
        debug!(
            "Local storage keeps no metadata; ignoring update for workspace {}",
            metadata.id
        );
        Ok(())
    }

    async fn delete_workspace(&self, workspace_id: WorkspaceId) -> Result<bool> {
        debug!(
            "Local storage does not delete workspaces; workspace {} kept",
            workspace_id
        );
        Ok(false)
    }

    async fn get_workspace(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        version: &str,
    ) -> Result<Option<String>> {
        if !is_main_branch(branch) || !version.is_empty() {
            return Ok(None);
        }

        match self.load_workspace(workspace_id).await {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_workspace(
        &self,
        metadata: &WorkspaceMetadata,
        json: &str,
        branch: &str,
    ) -> Result<()> {
        if !is_main_branch(branch) {
            return Err(branches_unsupported());
        }

        let dir = self.layout.writable_directory(metadata.id).await?;
        write_atomic(&dir.join(WORKSPACE_JSON_FILENAME), json.as_bytes()).await
    }

    async fn workspace_versions(
        &self,
        _workspace_id: WorkspaceId,
        _branch: &str,
        _max_versions: usize,
    ) -> Vec<WorkspaceVersion> {
        Vec::new()
    }

    async fn prune_workspace_versions(&self, _workspace_id: WorkspaceId, _max_versions: usize) {}

    async fn workspace_branches(&self, _workspace_id: WorkspaceId) -> Vec<String> {
        Vec::new()
    }

    async fn delete_branch(&self, _workspace_id: WorkspaceId, _branch: &str) -> Result<bool> {
        Ok(false)
    }

    async fn put_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
        source: &Path,
    ) -> Result<()> {
        filesystem::validate_image_filename(filename)?;
        let dir = self
            .images_directory(workspace_id, branch)
            .await
            .ok_or_else(branches_unsupported)?;
        filesystem::move_file(source, &dir.join(filename)).await
    }

    async fn get_image(
        &self,
        workspace_id: WorkspaceId,
        branch: &str,
        filename: &str,
    ) -> Option<ImageContent> {
        filesystem::validate_image_filename(filename).ok()?;
        let dir = self.images_directory(workspace_id, branch).await?;
        filesystem::read_image(&dir.join(filename)).await
    }

    async fn images(&self, workspace_id: WorkspaceId) -> Vec<Image> {
        match self.images_directory(workspace_id, "").await {
            Some(dir) => filesystem::list_images(&dir).await,
            None => Vec::new(),
        }
    }

    async fn delete_images(&self, workspace_id: WorkspaceId) -> Result<bool> {
        match self.images_directory(workspace_id, "").await {
            Some(dir) => filesystem::delete_images(&dir).await,
            None => Ok(false),
        }
    }

    fn last_modified_date(&self) -> i64 {
        self.scanner.last_modified()
    }

    async fn shutdown(&self) {
        self.scanner.stop().await;
    }
}

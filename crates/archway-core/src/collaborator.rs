//! Collaborators the engine consumes but does not implement.
//!
//! DSL compilation, model inspection and search indexing live outside the
//! storage engine. The defaults here let the engine run without them.

use crate::error::{ArchwayError, Result};
use crate::workspace::{WorkspaceDocument, WorkspaceId};
use std::path::Path;

/// Compiles DSL source into a workspace document.
pub trait DslParser: Send + Sync {
    /// Parses `source`, read from `path`.
    ///
    /// `previous` is the last compiled document, if any, so layout
    /// information can be carried over.
    fn parse(
        &self,
        source: &str,
        path: &Path,
        previous: Option<&WorkspaceDocument>,
    ) -> Result<WorkspaceDocument>;
}

/// Scope validation and default inspections.
pub trait WorkspaceValidator: Send + Sync {
    /// Returns inspection violations, or an error when the scope is invalid.
    fn validate(&self, workspace: &WorkspaceDocument) -> Result<Vec<String>>;
}

/// Search index, notified when workspaces are hard deleted.
pub trait SearchIndexer: Send + Sync {
    fn delete(&self, workspace_id: WorkspaceId);
}

/// Parser used when no DSL support is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDslParser;

impl DslParser for UnsupportedDslParser {
    fn parse(
        &self,
        _source: &str,
        path: &Path,
        _previous: Option<&WorkspaceDocument>,
    ) -> Result<WorkspaceDocument> {
        Err(ArchwayError::validation(format!(
            "DSL parsing is not available; cannot compile {}",
            path.display()
        )))
    }
}

/// How strictly a workspace's declared scope is enforced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeValidation {
    /// Every workspace must declare a scope.
    Strict,
    /// A missing scope is accepted.
    #[default]
    Relaxed,
}

const KNOWN_SCOPES: [&str; 2] = ["Landscape", "SoftwareSystem"];

/// Checks the declared scope against the known scope names.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeValidator {
    pub mode: ScopeValidation,
}

impl ScopeValidator {
    pub fn new(mode: ScopeValidation) -> Self {
        Self { mode }
    }
}

impl WorkspaceValidator for ScopeValidator {
    fn validate(&self, workspace: &WorkspaceDocument) -> Result<Vec<String>> {
        match workspace.scope() {
            Some(scope) if KNOWN_SCOPES.iter().any(|s| s.eq_ignore_ascii_case(&scope)) => {
                Ok(Vec::new())
            }
            Some(scope) => Err(ArchwayError::validation(format!(
                "Workspace scope \"{}\" is not recognised",
                scope
            ))),
            None if self.mode == ScopeValidation::Strict => Err(ArchwayError::validation(
                "Workspace is unscoped; please set a workspace scope of \"Landscape\" or \"SoftwareSystem\"",
            )),
            None => Ok(Vec::new()),
        }
    }
}

/// Indexer used when search is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSearchIndexer;

impl SearchIndexer for NoOpSearchIndexer {
    fn delete(&self, _workspace_id: WorkspaceId) {}
}

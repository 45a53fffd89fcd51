//! Error types for the Archway storage engine.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the entire Archway engine.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize)]
pub enum ArchwayError {
    /// No content or metadata for the requested entity.
    #[error("{entity_type} '{id}' could not be found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The workspace exists but the named branch does not.
    #[error("Workspace {workspace_id} does not have a branch named \"{branch}\"")]
    BranchNotFound { workspace_id: u64, branch: String },

    /// A write was rejected because another holder owns the workspace lock.
    #[error("{message}")]
    LockConflict { message: String },

    /// Content exceeds the configured size ceiling.
    #[error(
        "Workspace {workspace_id} is {:.3} MB, which exceeds the maximum size of {:.3} MB",
        megabytes(.size),
        megabytes(.max_size)
    )]
    TooLarge {
        workspace_id: u64,
        size: u64,
        max_size: u64,
    },

    /// Invalid input (branch name, workspace scope, version identifier).
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "properties"
        message: String,
    },

    /// Encryption or decryption failure.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / 1_000_000.0
}

impl ArchwayError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a BranchNotFound error
    pub fn branch_not_found(workspace_id: u64, branch: impl Into<String>) -> Self {
        Self::BranchNotFound {
            workspace_id,
            branch: branch.into(),
        }
    }

    /// Creates a LockConflict error
    pub fn lock_conflict(message: impl Into<String>) -> Self {
        Self::LockConflict {
            message: message.into(),
        }
    }

    /// Creates a TooLarge error
    pub fn too_large(workspace_id: u64, size: u64, max_size: u64) -> Self {
        Self::TooLarge {
            workspace_id,
            size,
            max_size,
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an IO error that names the path it happened on.
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {} (kind: {:?})", path.display(), err, err.kind()),
        }
    }

    /// Creates a Serialization error
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates an Encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a BranchNotFound error
    pub fn is_branch_not_found(&self) -> bool {
        matches!(self, Self::BranchNotFound { .. })
    }

    /// Check if this is a LockConflict error
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }

    /// Check if this is a TooLarge error
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true for errors a caller should present as "not found".
    pub fn is_missing(&self) -> bool {
        self.is_not_found() || self.is_branch_not_found()
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ArchwayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ArchwayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ArchwayError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ArchwayError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Convenience alias used across the engine.
pub type Result<T> = std::result::Result<T, ArchwayError>;

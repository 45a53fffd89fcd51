//! Workspace domain: identifiers, metadata, documents, versions, branches,
//! images, and the storage and cache traits.

pub mod adapter;
pub mod branch;
pub mod cache;
pub mod document;
pub mod id;
pub mod image;
pub mod metadata;
pub mod version;

pub use adapter::WorkspaceAdapter;
pub use branch::{
    MAIN_BRANCH, WorkspaceBranch, is_main_branch, is_valid_branch_name, validate_branch_name,
};
pub use cache::WorkspaceMetadataCache;
pub use document::{
    ConfiguredUser, Role, Visibility, WorkspaceConfiguration, WorkspaceDocument,
    is_encrypted_envelope,
};
pub use id::{WorkspaceId, is_numeric_name, parse_workspace_id};
pub use image::{Image, ImageContent, is_image_filename};
pub use metadata::{LOCK_TTL, WorkspaceMetadata, format_iso_date, parse_iso_date};
pub use version::{
    WorkspaceVersion, format_version_id, is_version_id, parse_version_id,
    user_friendly_version, version_filename, version_id_from_filename,
};

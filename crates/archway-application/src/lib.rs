//! Application layer for archway.
//!
//! Provides the `WorkspaceService` façade that coordinates storage adapters,
//! metadata caching, encryption and access rules, plus the bootstrap that
//! assembles it from configuration.

pub mod bootstrap;
pub mod workspace_service;

pub use bootstrap::{build_service, build_service_with};
pub use workspace_service::{
    LockOutcome, ServiceSettings, VisibleWorkspace, WorkspaceAccess, WorkspaceService,
};

//! Storage adapter implementations.

pub mod local;
pub mod server;

pub use local::{LocalFileSystemWorkspaceAdapter, LocalLayout, SINGLE_WORKSPACE_ID};
pub use server::ServerFileSystemWorkspaceAdapter;

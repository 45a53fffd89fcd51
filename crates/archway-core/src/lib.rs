pub mod collaborator;
pub mod config;
pub mod error;
pub mod user;
pub mod workspace;

// Re-export common error type
pub use error::{ArchwayError, Result};

pub mod adapter;
pub mod cache;
pub mod config_service;
pub mod encryption;
pub mod logging;
pub mod paths;
pub mod properties;
pub mod registry;
pub mod scanner;
pub mod storage;

pub use crate::adapter::{
    LocalFileSystemWorkspaceAdapter, LocalLayout, SINGLE_WORKSPACE_ID,
    ServerFileSystemWorkspaceAdapter,
};
pub use crate::cache::{InMemoryWorkspaceMetadataCache, NoOpWorkspaceMetadataCache};
pub use crate::config_service::ConfigService;
pub use crate::encryption::{AesEncryptionStrategy, EncryptionLocation, envelope_location};
pub use crate::logging::init_logging;
pub use crate::paths::ArchwayPaths;
pub use crate::registry::{AdapterRegistry, CacheRegistry, StorageContext};
pub use crate::scanner::StalenessScanner;

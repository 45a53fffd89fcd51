//! Metadata cache implementations.

use archway_core::workspace::{WorkspaceId, WorkspaceMetadata, WorkspaceMetadataCache};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Cache that never hits, so every read goes to the adapter.
///
/// The safe choice when several processes share one data directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWorkspaceMetadataCache;

#[async_trait]
impl WorkspaceMetadataCache for NoOpWorkspaceMetadataCache {
    async fn get(&self, _workspace_id: WorkspaceId) -> Option<WorkspaceMetadata> {
        None
    }

    async fn put(&self, _metadata: &WorkspaceMetadata) {}
}

/// Process-local cache whose entries expire a fixed time after being written.
#[derive(Debug)]
pub struct InMemoryWorkspaceMetadataCache {
    expiry: Duration,
    entries: RwLock<HashMap<WorkspaceId, (WorkspaceMetadata, Instant)>>,
}

impl InMemoryWorkspaceMetadataCache {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_expiry_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes * 60))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl WorkspaceMetadataCache for InMemoryWorkspaceMetadataCache {
    async fn get(&self, workspace_id: WorkspaceId) -> Option<WorkspaceMetadata> {
        {
            let entries = self.entries.read().await;
            match entries.get(&workspace_id) {
                Some((metadata, written)) if written.elapsed() < self.expiry => {
                    return Some(metadata.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // expired
        let mut entries = self.entries.write().await;
        if entries
            .get(&workspace_id)
            .is_some_and(|(_, written)| written.elapsed() >= self.expiry)
        {
            entries.remove(&workspace_id);
            debug!("Evicted expired metadata for workspace {}", workspace_id);
        }
        None
    }

    async fn put(&self, metadata: &WorkspaceMetadata) {
        self.entries
            .write()
            .await
            .insert(metadata.id, (metadata.clone(), Instant::now()));
    }

    async fn shutdown(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_op_cache_always_misses() {
        let cache = NoOpWorkspaceMetadataCache;
        cache.put(&WorkspaceMetadata::new(1)).await;
        assert!(cache.get(1).await.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_cache_hits() {
        let cache = InMemoryWorkspaceMetadataCache::with_expiry_minutes(5);
        let mut metadata = WorkspaceMetadata::new(1);
        metadata.set_name("Cached");
        cache.put(&metadata).await;

        assert_eq!(cache.get(1).await.unwrap().name(), "Cached");
        assert!(cache.get(2).await.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_cache_expires() {
        let cache = InMemoryWorkspaceMetadataCache::new(Duration::from_millis(10));
        cache.put(&WorkspaceMetadata::new(1)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get(1).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_clears() {
        let cache = InMemoryWorkspaceMetadataCache::with_expiry_minutes(5);
        cache.put(&WorkspaceMetadata::new(1)).await;
        cache.shutdown().await;
        assert_eq!(cache.len().await, 0);
    }
}

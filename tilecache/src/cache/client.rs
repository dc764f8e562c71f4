//! Best-effort cache client.
//!
//! `TileCache` wraps any [`TileStore`] and applies the serving policy:
//! - Reads, deletes, cleanup and stats never fail; store errors are logged
//!   and degrade to a miss or an empty result
//! - Writes propagate failures as [`CacheError::WriteFailed`]

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::traits::TileStore;
use crate::cache::types::{CacheError, CacheStats, TopEntry};

/// Cache client used by the orchestrator, reclaimer and admin surfaces.
#[derive(Clone)]
pub struct TileCache {
    store: Arc<dyn TileStore>,
}

impl TileCache {
    /// Create a client over a store.
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn TileStore> {
        Arc::clone(&self.store)
    }

    /// Look up a payload. Store failures count as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.get(key).await {
            Ok(Some(data)) => {
                debug!(key = %key, size = data.len(), "Cache hit");
                Some(data)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), key = %key, "Cache get failed");
                None
            }
        }
    }

    /// Store a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::WriteFailed`] when the store rejects the write.
    pub async fn set(&self, key: &str, data: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let size = data.len();
        match self.store.set(key, data, ttl).await {
            Ok(()) => {
                debug!(key = %key, size, ttl_secs = ttl.as_secs(), "Cache set");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Cache set failed");
                Err(CacheError::WriteFailed(e))
            }
        }
    }

    /// Delete one entry. Returns whether it existed; `false` on store failure.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(existed) => {
                debug!(key = %key, existed, "Cache delete");
                existed
            }
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), key = %key, "Cache delete failed");
                false
            }
        }
    }

    /// Delete entries matching a glob. Returns 0 on store failure.
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        match self.store.delete_by_pattern(pattern).await {
            Ok(count) => {
                debug!(pattern = %pattern, count, "Deleted cache entries matching pattern");
                count
            }
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), pattern = %pattern, "Cache pattern delete failed");
                0
            }
        }
    }

    /// Delete every entry. Returns 0 on store failure.
    pub async fn clear(&self) -> u64 {
        match self.store.clear().await {
            Ok(count) => {
                info!(count, "Cache cleared");
                count
            }
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), "Cache clear failed");
                0
            }
        }
    }

    /// Remove expired entries, surfacing the failure to the caller.
    ///
    /// The reclaimer uses this to log failures without stopping.
    pub async fn try_cleanup_expired(&self) -> Result<u64, CacheError> {
        let count = self
            .store
            .cleanup_expired()
            .await
            .map_err(CacheError::Unavailable)?;
        if count > 0 {
            info!(count, "Cleaned up expired cache entries");
        }
        Ok(count)
    }

    /// Remove expired entries. Returns 0 on store failure.
    pub async fn cleanup_expired(&self) -> u64 {
        match self.try_cleanup_expired().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Expired cache cleanup failed");
                0
            }
        }
    }

    /// Trim live entries to `max_entries`. Returns 0 on store failure.
    pub async fn limit_size(&self, max_entries: u64) -> u64 {
        match self.store.limit_size(max_entries).await {
            Ok(count) => {
                if count > 0 {
                    info!(count, max_entries, "Pruned least-used cache entries");
                }
                count
            }
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), max_entries, "Cache size limiting failed");
                0
            }
        }
    }

    /// Aggregate statistics; `None` on store failure.
    pub async fn stats(&self) -> Option<CacheStats> {
        match self.store.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), "Cache stats failed");
                None
            }
        }
    }

    /// Most-hit entries; empty on store failure.
    pub async fn top_entries(&self, limit: u32) -> Vec<TopEntry> {
        match self.store.top_entries(limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %CacheError::Unavailable(e), limit, "Cache top entries failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::traits::BoxFuture;
    use crate::cache::types::StoreError;
    use crate::cache::MemoryTileStore;

    /// Store whose every operation fails.
    pub(crate) struct FailingStore;

    fn down() -> StoreError {
        StoreError::Pool("connection refused".to_string())
    }

    impl TileStore for FailingStore {
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn set(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Duration,
        ) -> BoxFuture<'_, Result<(), StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn delete(&self, _key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn delete_by_pattern(&self, _pattern: &str) -> BoxFuture<'_, Result<u64, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn clear(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn cleanup_expired(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn limit_size(&self, _max_entries: u64) -> BoxFuture<'_, Result<u64, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
            Box::pin(async { Err(down()) })
        }
        fn top_entries(&self, _limit: u32) -> BoxFuture<'_, Result<Vec<TopEntry>, StoreError>> {
            Box::pin(async { Err(down()) })
        }
    }

    #[tokio::test]
    async fn test_reads_degrade_on_store_failure() {
        let cache = TileCache::new(Arc::new(FailingStore));

        assert!(cache.get("tile:1:0:0").await.is_none());
        assert!(!cache.delete("tile:1:0:0").await);
        assert_eq!(cache.delete_by_pattern("tile:1:*").await, 0);
        assert_eq!(cache.clear().await, 0);
        assert_eq!(cache.cleanup_expired().await, 0);
        assert_eq!(cache.limit_size(10).await, 0);
        assert!(cache.stats().await.is_none());
        assert!(cache.top_entries(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let cache = TileCache::new(Arc::new(FailingStore));

        let result = cache.set("tile:1:0:0", vec![1], Duration::from_secs(60)).await;
        assert!(matches!(result, Err(CacheError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_try_cleanup_surfaces_failure() {
        let cache = TileCache::new(Arc::new(FailingStore));
        assert!(matches!(
            cache.try_cleanup_expired().await,
            Err(CacheError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_round_trip_through_client() {
        let store = Arc::new(MemoryTileStore::new());
        let cache = TileCache::new(store.clone());

        cache
            .set("tile:3:1:2", vec![7, 7], Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("tile:3:1:2").await, Some(vec![7, 7]));
        assert_eq!(store.hit_count("tile:3:1:2"), Some(1));
        assert!(cache.delete("tile:3:1:2").await);
        assert!(cache.get("tile:3:1:2").await.is_none());
    }
}

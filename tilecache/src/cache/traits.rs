//! Core trait for the persistent tile store.
//!
//! `TileStore` is the seam between the cache client and the backing store.
//! Every operation maps to one atomic statement against the backing store,
//! so callers never need in-process locking to stay consistent.
//!
//! # Design Principles
//!
//! - **String keys**: canonical tile identifiers such as `tile:14:8192:8191`
//! - **Vec<u8> values**: opaque compressed tile payloads
//! - **Read-time expiry**: an expired entry is a miss even before cleanup runs
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` for trait object support

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::types::{CacheStats, StoreError, TopEntry};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent key/blob store with TTL, hit counters and eviction.
///
/// Implementations return raw [`StoreError`]s; the best-effort failure
/// policy (reads degrade to misses, writes propagate) lives in
/// [`TileCache`](super::TileCache).
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
pub trait TileStore: Send + Sync {
    /// Look up a live entry.
    ///
    /// On a hit the entry's hit count is incremented and its last-accessed
    /// time refreshed in the same statement. Entries whose expiry has passed
    /// are misses and are not touched.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>>;

    /// Insert or replace an entry.
    ///
    /// A write is a fresh lease: payload and expiry are replaced, the created
    /// and last-accessed times reset to now and the hit count to zero.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration)
        -> BoxFuture<'_, Result<(), StoreError>>;

    /// Delete one entry.
    ///
    /// Returns `true` if the key existed. A missing key is not an error.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Delete every entry whose key matches a shell-style glob.
    ///
    /// `*` matches any substring and `?` any single character. Returns the
    /// number of entries removed.
    fn delete_by_pattern(&self, pattern: &str) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Delete every entry. Returns the number removed.
    fn clear(&self) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Delete every entry whose expiry has passed. Returns the number removed.
    fn cleanup_expired(&self) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Trim live entries down to `max_entries`.
    ///
    /// Victims are chosen by ascending hit count, then ascending last-accessed
    /// time, then key. Returns the number removed.
    fn limit_size(&self, max_entries: u64) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Aggregate statistics. No side effects.
    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>>;

    /// The `limit` most-hit entries, by descending hit count.
    fn top_entries(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TopEntry>, StoreError>>;
}

//! In-process tile store.
//!
//! Mirrors the statements of [`PostgresTileStore`](super::PostgresTileStore)
//! over a `HashMap` guarded by a `parking_lot::Mutex`, so every operation is
//! atomic just like its single-statement SQL counterpart. Useful for tests
//! and for running the server without a database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::pattern::KeyPattern;
use crate::cache::traits::{BoxFuture, TileStore};
use crate::cache::types::{CacheStats, StoreError, TopEntry};

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: Vec<u8>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hit_count: u64,
    last_accessed: DateTime<Utc>,
}

impl StoredEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// In-memory [`TileStore`].
pub struct MemoryTileStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTileStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Physical row count, expired rows included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Hit count of an entry, regardless of expiry.
    pub fn hit_count(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).map(|e| e.hit_count)
    }

    /// Last-accessed time of an entry, regardless of expiry.
    pub fn last_accessed(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().get(key).map(|e| e.last_accessed)
    }

    /// Whether a row exists, regardless of expiry.
    pub fn contains_row(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl Default for MemoryTileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ttl_to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
}

impl TileStore for MemoryTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let now = self.clock.now();
            let mut entries = self.entries.lock();
            match entries.get_mut(&key) {
                Some(entry) if entry.is_live(now) => {
                    entry.hit_count += 1;
                    entry.last_accessed = now;
                    Ok(Some(entry.payload.clone()))
                }
                _ => Ok(None),
            }
        })
    }

    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let now = self.clock.now();
            let expires_at = now
                .checked_add_signed(ttl_to_chrono(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.entries.lock().insert(
                key,
                StoredEntry {
                    payload: value,
                    created_at: now,
                    expires_at,
                    hit_count: 0,
                    last_accessed: now,
                },
            );
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.lock().remove(&key).is_some()) })
    }

    fn delete_by_pattern(&self, pattern: &str) -> BoxFuture<'_, Result<u64, StoreError>> {
        let pattern = KeyPattern::new(pattern);
        Box::pin(async move {
            let glob = match pattern.to_glob() {
                Ok(glob) => glob,
                Err(e) => {
                    warn!(pattern = %pattern.as_str(), error = %e, "Unusable key pattern");
                    return Ok(0);
                }
            };

            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|key, _| !glob.matches(key));
            Ok((before - entries.len()) as u64)
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock();
            let removed = entries.len() as u64;
            entries.clear();
            Ok(removed)
        })
    }

    fn cleanup_expired(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            Ok((before - entries.len()) as u64)
        })
    }

    fn limit_size(&self, max_entries: u64) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut entries = self.entries.lock();

            let mut live: Vec<(&String, &StoredEntry)> =
                entries.iter().filter(|(_, e)| e.is_live(now)).collect();
            let excess = (live.len() as u64).saturating_sub(max_entries) as usize;
            if excess == 0 {
                return Ok(0);
            }

            live.sort_by(|(ka, a), (kb, b)| {
                a.hit_count
                    .cmp(&b.hit_count)
                    .then(a.last_accessed.cmp(&b.last_accessed))
                    .then(ka.cmp(kb))
            });
            let victims: Vec<String> = live
                .into_iter()
                .take(excess)
                .map(|(key, _)| key.clone())
                .collect();

            for key in &victims {
                entries.remove(key);
            }
            Ok(victims.len() as u64)
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let entries = self.entries.lock();

            let total_entries = entries.len() as u64;
            let active_entries = entries.values().filter(|e| e.is_live(now)).count() as u64;
            let total_hits: u64 = entries.values().map(|e| e.hit_count).sum();
            let avg_hits_per_entry = if total_entries == 0 {
                0.0
            } else {
                total_hits as f64 / total_entries as f64
            };
            let oldest = entries.values().map(|e| e.created_at).min();
            let approximate_storage_size = entries
                .iter()
                .map(|(k, e)| (k.len() + e.payload.len()) as u64)
                .sum();

            Ok(CacheStats {
                total_entries,
                active_entries,
                expired_entries: total_entries - active_entries,
                total_hits,
                avg_hits_per_entry,
                oldest_entry_age_secs: oldest.map(|t| (now - t).num_seconds()),
                last_access_time: entries.values().map(|e| e.last_accessed).max(),
                approximate_storage_size,
            })
        })
    }

    fn top_entries(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TopEntry>, StoreError>> {
        Box::pin(async move {
            let now = self.clock.now();
            let entries = self.entries.lock();

            let mut top: Vec<TopEntry> = entries
                .iter()
                .map(|(key, e)| TopEntry {
                    key: key.clone(),
                    hit_count: e.hit_count,
                    created_at: e.created_at,
                    last_accessed: e.last_accessed,
                    is_active: e.is_live(now),
                })
                .collect();
            top.sort_by(|a, b| b.hit_count.cmp(&a.hit_count).then(a.key.cmp(&b.key)));
            top.truncate(limit as usize);
            Ok(top)
        })
    }
}

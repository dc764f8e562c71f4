//! Cache value types and errors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Raw backing-store failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No connection could be obtained from the pool.
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// The statement failed in the database.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Cache failures visible to callers of [`TileCache`](super::TileCache).
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The store could not serve a read, delete, cleanup or stats call.
    #[error("Cache store unavailable: {0}")]
    Unavailable(#[source] StoreError),

    /// The store failed to persist a write.
    #[error("Cache write failed: {0}")]
    WriteFailed(#[source] StoreError),
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Rows physically present, expired or not.
    pub total_entries: u64,
    /// Rows whose expiry is still in the future.
    pub active_entries: u64,
    /// Rows past expiry that cleanup has not removed yet.
    pub expired_entries: u64,
    /// Sum of hit counts.
    pub total_hits: u64,
    /// Mean hit count per row.
    pub avg_hits_per_entry: f64,
    /// Seconds since the oldest row was written.
    pub oldest_entry_age_secs: Option<i64>,
    /// Most recent access across all rows.
    pub last_access_time: Option<DateTime<Utc>>,
    /// Approximate bytes used by the cache.
    pub approximate_storage_size: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} active, {} expired), {} hits, {:.2} avg, {} bytes",
            self.total_entries,
            self.active_entries,
            self.expired_entries,
            self.total_hits,
            self.avg_hits_per_entry,
            self.approximate_storage_size
        )
    }
}

/// Summary of one heavily used entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopEntry {
    pub key: String,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub is_active: bool,
}

//! PostgreSQL tile store.
//!
//! Each [`TileStore`] operation is exactly one SQL statement, so PostgreSQL's
//! per-statement atomicity is the only coordination between concurrent
//! requests. Read-with-increment is an `UPDATE ... RETURNING`; writes are an
//! `INSERT ... ON CONFLICT DO UPDATE`. All values are bound as parameters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tracing::debug;

use crate::cache::pattern::KeyPattern;
use crate::cache::traits::{BoxFuture, TileStore};
use crate::cache::types::{CacheStats, StoreError, TopEntry};

/// Cache table DDL. Idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tile_cache (
    cache_key     TEXT PRIMARY KEY,
    tile_data     BYTEA NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    expires_at    TIMESTAMPTZ NOT NULL,
    hit_count     BIGINT NOT NULL DEFAULT 0,
    last_accessed TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_tile_cache_expires ON tile_cache (expires_at);
CREATE INDEX IF NOT EXISTS idx_tile_cache_accessed ON tile_cache (last_accessed);
"#;

const GET_SQL: &str = "\
UPDATE tile_cache
SET hit_count = hit_count + 1, last_accessed = NOW()
WHERE cache_key = $1 AND expires_at > NOW()
RETURNING tile_data";

const SET_SQL: &str = "\
INSERT INTO tile_cache (cache_key, tile_data, created_at, expires_at, hit_count, last_accessed)
VALUES ($1, $2, NOW(), NOW() + make_interval(secs => $3::float8), 0, NOW())
ON CONFLICT (cache_key) DO UPDATE SET
    tile_data = EXCLUDED.tile_data,
    created_at = EXCLUDED.created_at,
    expires_at = EXCLUDED.expires_at,
    hit_count = 0,
    last_accessed = EXCLUDED.last_accessed";

const DELETE_SQL: &str = "DELETE FROM tile_cache WHERE cache_key = $1";

const DELETE_PATTERN_SQL: &str = r"DELETE FROM tile_cache WHERE cache_key LIKE $1 ESCAPE '\'";

const CLEAR_SQL: &str = "DELETE FROM tile_cache";

const CLEANUP_SQL: &str = "DELETE FROM tile_cache WHERE expires_at <= NOW()";

const LIMIT_SIZE_SQL: &str = "\
WITH live AS (
    SELECT cache_key, hit_count, last_accessed
    FROM tile_cache
    WHERE expires_at > NOW()
),
excess AS (
    SELECT GREATEST(COUNT(*) - $1::bigint, 0) AS n FROM live
)
DELETE FROM tile_cache
WHERE cache_key IN (
    SELECT cache_key FROM live
    ORDER BY hit_count ASC, last_accessed ASC, cache_key ASC
    LIMIT (SELECT n FROM excess)
)";

const STATS_SQL: &str = "\
SELECT
    COUNT(*)::bigint,
    (COUNT(*) FILTER (WHERE expires_at > NOW()))::bigint,
    COALESCE(SUM(hit_count), 0)::bigint,
    COALESCE(AVG(hit_count), 0)::float8,
    MIN(created_at),
    MAX(last_accessed),
    pg_total_relation_size('tile_cache')::bigint,
    NOW()
FROM tile_cache";

const TOP_SQL: &str = "\
SELECT cache_key, hit_count, created_at, last_accessed, expires_at > NOW()
FROM tile_cache
ORDER BY hit_count DESC, cache_key ASC
LIMIT $1";

/// [`TileStore`] backed by the `tile_cache` table.
#[derive(Clone)]
pub struct PostgresTileStore {
    pool: Pool,
}

impl PostgresTileStore {
    /// Create a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the cache table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA_SQL).await?;
        debug!("Cache table verified");
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, StoreError> {
        self.pool.get().await.map_err(StoreError::from)
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64, StoreError> {
        let client = self.client().await?;
        let stmt = client.prepare_cached(sql).await?;
        Ok(client.execute(&stmt, params).await?)
    }
}

fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

impl TileStore for PostgresTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            let client = self.client().await?;
            let stmt = client.prepare_cached(GET_SQL).await?;
            let row = client.query_opt(&stmt, &[&key]).await?;
            Ok(row.map(|r| r.get::<_, Vec<u8>>(0)))
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
            let ttl_secs = ttl.as_secs_f64();
            self.execute(SET_SQL, &[&key, &value, &ttl_secs]).await?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.execute(DELETE_SQL, &[&key]).await? > 0) })
    }

    fn delete_by_pattern(&self, pattern: &str) -> BoxFuture<'_, Result<u64, StoreError>> {
        let like = KeyPattern::new(pattern).to_like();
        Box::pin(async move { self.execute(DELETE_PATTERN_SQL, &[&like]).await })
    }

    fn clear(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move { self.execute(CLEAR_SQL, &[]).await })
    }

    fn cleanup_expired(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move { self.execute(CLEANUP_SQL, &[]).await })
    }

    fn limit_size(&self, max_entries: u64) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let max_entries = i64::try_from(max_entries).unwrap_or(i64::MAX);
            self.execute(LIMIT_SIZE_SQL, &[&max_entries]).await
        })
    }

    fn stats(&self) -> BoxFuture<'_, Result<CacheStats, StoreError>> {
        Box::pin(async move {
            let client = self.client().await?;
            let stmt = client.prepare_cached(STATS_SQL).await?;
            let row = client.query_one(&stmt, &[]).await?;

            let total_entries = to_u64(row.get(0));
            let active_entries = to_u64(row.get(1));
            let oldest: Option<DateTime<Utc>> = row.get(4);
            let now: DateTime<Utc> = row.get(7);

            Ok(CacheStats {
                total_entries,
                active_entries,
                expired_entries: total_entries.saturating_sub(active_entries),
                total_hits: to_u64(row.get(2)),
                avg_hits_per_entry: row.get(3),
                oldest_entry_age_secs: oldest.map(|t| (now - t).num_seconds()),
                last_access_time: row.get(5),
                approximate_storage_size: to_u64(row.get(6)),
            })
        })
    }

    fn top_entries(&self, limit: u32) -> BoxFuture<'_, Result<Vec<TopEntry>, StoreError>> {
        Box::pin(async move {
            let client = self.client().await?;
            let stmt = client.prepare_cached(TOP_SQL).await?;
            let limit = i64::from(limit);
            let rows = client.query(&stmt, &[&limit]).await?;

            Ok(rows
                .iter()
                .map(|row| TopEntry {
                    key: row.get(0),
                    hit_count: to_u64(row.get(1)),
                    created_at: row.get(2),
                    last_accessed: row.get(3),
                    is_active: row.get(4),
                })
                .collect())
        })
    }
}

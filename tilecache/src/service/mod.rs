//! Tile orchestration.
//!
//! `TileService` implements cache-aside serving: validate the address, try
//! the cache, generate on a miss, store the result with a zoom-banded TTL.
//! It also fronts the cache-maintenance operations used by the admin routes
//! and the CLI.
//!
//! There is no request coalescing. Concurrent misses for one tile each
//! regenerate and the last write wins.

mod error;
mod ttl;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStats, TileCache, TopEntry};
use crate::coord::{CoordError, TileAddress, MAX_ZOOM};
use crate::generator::{GeneratorError, TileGenerator};

pub use error::ServiceError;
pub use ttl::TtlPolicy;

/// Cache-aside tile orchestrator. Cheap to clone.
#[derive(Clone)]
pub struct TileService {
    generator: Arc<dyn TileGenerator>,
    cache: Option<TileCache>,
    ttl: TtlPolicy,
}

impl TileService {
    /// Create a service that always generates.
    pub fn new(generator: Arc<dyn TileGenerator>) -> Self {
        Self {
            generator,
            cache: None,
            ttl: TtlPolicy::default(),
        }
    }

    /// Enable caching through `cache`.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the TTL bands.
    pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether results are cached.
    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// The cache client, if caching is enabled.
    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Serve one tile.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidCoordinate`] for addresses outside the grid
    /// - [`ServiceError::GenerationFailed`] when the generator fails
    /// - [`ServiceError::StoreWriteFailed`] when a fresh tile cannot be cached
    pub async fn get_tile(&self, zoom: u8, x: u32, y: u32) -> Result<Vec<u8>, ServiceError> {
        let tile = TileAddress::new(zoom, x, y)?;
        self.serve(tile).await
    }

    async fn serve(&self, tile: TileAddress) -> Result<Vec<u8>, ServiceError> {
        let Some(cache) = &self.cache else {
            return Ok(self.generate(tile).await?);
        };

        let key = tile.cache_key();
        if let Some(data) = cache.get(&key).await {
            return Ok(data);
        }

        let data = self.generate(tile).await?;
        let ttl = self.ttl.ttl_for_zoom(tile.zoom());
        if let Err(e) = cache.set(&key, data.clone(), ttl).await {
            warn!(tile = %tile, error = %e, "Generated tile could not be cached");
            return Err(e.into());
        }
        Ok(data)
    }

    async fn generate(&self, tile: TileAddress) -> Result<Vec<u8>, GeneratorError> {
        match self.generator.generate(tile).await {
            Ok(data) => {
                debug!(tile = %tile, generator = self.generator.name(), size = data.len(), "Tile generated");
                Ok(data)
            }
            Err(e) => {
                warn!(tile = %tile, generator = self.generator.name(), error = %e, "Tile generation failed");
                Err(e)
            }
        }
    }

    /// Drop one cached tile. Returns whether it was cached.
    pub async fn invalidate_tile(&self, zoom: u8, x: u32, y: u32) -> Result<bool, ServiceError> {
        let tile = TileAddress::new(zoom, x, y)?;
        match &self.cache {
            Some(cache) => Ok(cache.delete(&tile.cache_key()).await),
            None => Ok(false),
        }
    }

    /// Drop every cached tile at `zoom`.
    pub async fn invalidate_zoom(&self, zoom: u8) -> Result<u64, ServiceError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom).into());
        }
        match &self.cache {
            Some(cache) => Ok(cache.delete_by_pattern(&TileAddress::zoom_pattern(zoom)).await),
            None => Ok(0),
        }
    }

    /// Drop every cached tile.
    pub async fn invalidate_all(&self) -> u64 {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => 0,
        }
    }

    /// Cache statistics; `None` when caching is off or the store is down.
    pub async fn stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => cache.stats().await,
            None => None,
        }
    }

    /// Most requested cached tiles.
    pub async fn popular_tiles(&self, limit: u32) -> Vec<TopEntry> {
        match &self.cache {
            Some(cache) => cache.top_entries(limit).await,
            None => Vec::new(),
        }
    }

    /// Remove expired entries now.
    pub async fn cleanup_expired(&self) -> u64 {
        match &self.cache {
            Some(cache) => cache.cleanup_expired().await,
            None => 0,
        }
    }

    /// Trim the cache to `max_entries` live entries.
    pub async fn prune(&self, max_entries: u64) -> u64 {
        match &self.cache {
            Some(cache) => cache.limit_size(max_entries).await,
            None => 0,
        }
    }
}

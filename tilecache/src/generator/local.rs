//! Local tile generation from the spatial dataset.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tracing::debug;

use crate::cache::BoxFuture;
use crate::coord::{tile_bounds, Crs, TileAddress};

use super::encoding::gzip;
use super::layers::{layer_tolerance, layers_for_zoom, LayerSpec, DEFAULT_BUFFER, DEFAULT_EXTENT};
use super::source::{FeatureSource, LayerQuery};
use super::{GeneratorError, TileGenerator};

/// Default per-layer query timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Generator that assembles tiles from per-layer dataset queries.
///
/// Qualifying layers are queried concurrently; fragments are concatenated in
/// layer-table order, skipping empty ones, then gzip-compressed. A tile with
/// no fragments is returned as an empty payload.
pub struct LocalTileGenerator {
    source: Arc<dyn FeatureSource>,
    query_timeout: Duration,
    extent: u32,
    buffer: u32,
}

impl LocalTileGenerator {
    pub fn new(source: Arc<dyn FeatureSource>) -> Self {
        Self {
            source,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            extent: DEFAULT_EXTENT,
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Bound each layer query.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Override the MVT extent and clip buffer.
    pub fn with_extent(mut self, extent: u32, buffer: u32) -> Self {
        self.extent = extent;
        self.buffer = buffer;
        self
    }

    async fn query_layer(
        &self,
        layer: &'static LayerSpec,
        query: LayerQuery,
    ) -> Result<Vec<u8>, GeneratorError> {
        tokio::time::timeout(self.query_timeout, self.source.layer_tile(layer, &query))
            .await
            .map_err(|_| GeneratorError::Timeout(self.query_timeout))?
    }

    async fn assemble(&self, tile: TileAddress) -> Result<Vec<u8>, GeneratorError> {
        let start = Instant::now();
        let bounds = tile_bounds(&tile, Crs::WebMercator);
        let layers = layers_for_zoom(tile.zoom());

        let fragments = try_join_all(layers.iter().map(|&layer| {
            let query = LayerQuery {
                bounds,
                tolerance: layer_tolerance(layer, tile.zoom(), self.extent),
                extent: self.extent,
                buffer: self.buffer,
            };
            self.query_layer(layer, query)
        }))
        .await?;

        let raw: Vec<u8> = fragments.concat();
        if raw.is_empty() {
            debug!(tile = %tile, layers = layers.len(), "Tile has no features");
            return Ok(Vec::new());
        }

        let compressed = gzip(&raw)?;
        debug!(
            tile = %tile,
            layers = layers.len(),
            raw_size = raw.len(),
            size = compressed.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tile assembled"
        );
        Ok(compressed)
    }
}

impl TileGenerator for LocalTileGenerator {
    fn generate(&self, tile: TileAddress) -> BoxFuture<'_, Result<Vec<u8>, GeneratorError>> {
        Box::pin(self.assemble(tile))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

//! Dataset boundary for local generation.

use crate::cache::BoxFuture;
use crate::coord::BoundingBox;

use super::layers::LayerSpec;
use super::GeneratorError;

/// Parameters for cutting one layer out of the dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerQuery {
    /// Tile envelope in Web Mercator meters.
    pub bounds: BoundingBox,
    /// Simplification tolerance in meters; 0 keeps exact geometry.
    pub tolerance: f64,
    /// MVT extent.
    pub extent: u32,
    /// Clipping buffer in tile units.
    pub buffer: u32,
}

/// Source of encoded MVT layer fragments.
pub trait FeatureSource: Send + Sync {
    /// Encode the features of `layer` intersecting `query.bounds` as one MVT
    /// layer. An empty vector means the layer has no features here.
    fn layer_tile<'a>(
        &'a self,
        layer: &'static LayerSpec,
        query: &'a LayerQuery,
    ) -> BoxFuture<'a, Result<Vec<u8>, GeneratorError>>;
}

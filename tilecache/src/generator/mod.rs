//! Tile generation strategies.
//!
//! A [`TileGenerator`] turns a validated [`TileAddress`] into a compressed
//! vector tile payload. Two strategies exist and are chosen by configuration:
//!
//! - [`LocalTileGenerator`] - queries the spatial dataset one layer at a time
//!   through a [`FeatureSource`] and assembles the result
//! - [`ProxyTileGenerator`] - forwards to an external tile server
//!
//! A zero-length payload is a valid tile with no features.

mod encoding;
mod http;
pub mod layers;
mod local;
mod postgis;
mod proxy;
mod source;

use std::time::Duration;

use thiserror::Error;

use crate::cache::BoxFuture;
use crate::coord::TileAddress;

pub use encoding::{ensure_gzip, gzip, is_gzip, GZIP_MAGIC};
pub use http::{HttpClient, HttpResponse, ReqwestClient, MVT_ACCEPT};
pub use layers::{layers_for_zoom, LayerSpec, SimplificationTier, LAYERS};
pub use local::LocalTileGenerator;
pub use postgis::{layer_sql, PostgisFeatureSource};
pub use proxy::ProxyTileGenerator;
pub use source::{FeatureSource, LayerQuery};

/// Errors raised while producing a tile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    /// A spatial dataset query failed.
    #[error("Dataset query failed: {0}")]
    Query(String),

    /// The upstream tile server failed or answered with an error status.
    #[error("Upstream tile server error: {0}")]
    Upstream(String),

    /// A query or request exceeded its time bound.
    #[error("Tile generation timed out after {0:?}")]
    Timeout(Duration),

    /// No dataset connection could be acquired.
    #[error("Dataset connection unavailable: {0}")]
    Pool(String),

    /// Compressing the assembled tile failed.
    #[error("Failed to encode tile: {0}")]
    Encode(String),
}

impl From<deadpool_postgres::PoolError> for GeneratorError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        GeneratorError::Pool(err.to_string())
    }
}

impl From<tokio_postgres::Error> for GeneratorError {
    fn from(err: tokio_postgres::Error) -> Self {
        GeneratorError::Query(err.to_string())
    }
}

/// Strategy for producing tile payloads.
///
/// Implementations must be `Send + Sync`; one instance serves every request.
pub trait TileGenerator: Send + Sync {
    /// Produce the payload for `tile`.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError` when the dataset or upstream fails, times
    /// out, or the payload cannot be encoded.
    fn generate(&self, tile: TileAddress) -> BoxFuture<'_, Result<Vec<u8>, GeneratorError>>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

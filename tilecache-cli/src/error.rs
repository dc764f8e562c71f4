//! CLI error type.

use thiserror::Error;
use tilecache::app::{AppError, ConfigError};
use tilecache::coord::CoordError;
use tilecache::logging::LoggingError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    App(#[from] AppError),

    #[error("{0}")]
    Logging(#[from] LoggingError),

    #[error("{0}")]
    InvalidTile(#[from] CoordError),

    #[error("Caching is disabled (CACHE_TILE_ENABLED=false)")]
    CacheDisabled,

    #[error("Cache statistics are unavailable; check the database connection")]
    StatsUnavailable,

    #[error("{0}")]
    Usage(String),
}

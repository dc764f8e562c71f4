//! Application bootstrap and lifecycle management.
//!
//! [`TileServerApp`] resolves the configured components, starts the
//! background tasks they own (cache reclaimer, pool maintenance) and stops
//! them in order on shutdown.
//!
//! # Example
//!
//! ```ignore
//! use tilecache::app::{AppConfig, TileServerApp};
//!
//! let app = TileServerApp::start(AppConfig::load(None)?).await?;
//! let listener = app.bind().await?;
//! app.serve(listener, shutdown_signal()).await?;
//! app.shutdown().await;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{open_cache, TileServerApp};
pub use config::{
    AppConfig, CacheBackend, CacheConfig, ConfigError, DatabaseConfig, GeneratorConfig,
    GeneratorKind, ServerConfig,
};
pub use error::AppError;

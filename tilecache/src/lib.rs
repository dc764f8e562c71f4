//! tilecache - Vector map tiles with a persistent cache
//!
//! This library serves slippy-map vector tiles over HTTP. Tiles are generated
//! on demand, either from an osm2pgsql spatial database or by forwarding to an
//! upstream tile server, and cached in PostgreSQL with zoom-banded expiry.

pub mod app;
pub mod cache;
pub mod coord;
pub mod db;
pub mod generator;
pub mod logging;
pub mod reclaimer;
pub mod server;
pub mod service;

/// Crate version, as advertised in TileJSON.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

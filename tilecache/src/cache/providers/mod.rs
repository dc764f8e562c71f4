//! Tile store implementations.
//!
//! # Available Providers
//!
//! - [`PostgresTileStore`]: durable store over a pooled PostgreSQL connection
//! - [`MemoryTileStore`]: in-process store with identical semantics

mod memory;
mod postgres;

pub use memory::MemoryTileStore;
pub use postgres::{PostgresTileStore, SCHEMA_SQL};

//! Persistent tile cache.
//!
//! - [`TileStore`]: the backing-store seam (one atomic statement per operation)
//! - [`providers`]: PostgreSQL and in-memory stores
//! - [`TileCache`]: best-effort client applying the serving failure policy

mod client;
pub mod clock;
mod pattern;
pub mod providers;
mod traits;
mod types;

pub use client::TileCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use pattern::KeyPattern;
pub use providers::{MemoryTileStore, PostgresTileStore};
pub use traits::{BoxFuture, TileStore};
pub use types::{CacheError, CacheStats, StoreError, TopEntry};

#[cfg(test)]
pub(crate) use client::tests::FailingStore;

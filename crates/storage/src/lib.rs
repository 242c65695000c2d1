//! Tile storage for the weather tile service.
//!
//! Provides:
//! - [`TileStore`]: TTL store of rendered tiles with stale fallback
//! - [`TileMemoryCache`]: in-process store
//! - [`DiskTileCache`]: one PNG file per tile
//! - [`RenderCoalescer`]: at most one concurrent render per key

pub mod disk;
pub mod inflight;
pub mod memory;
pub mod store;

pub use disk::DiskTileCache;
pub use inflight::{Coalesced, RenderCoalescer};
pub use memory::{CacheEntry, TileMemoryCache};
pub use store::{CacheStatsSnapshot, StaleTile, TileStore};

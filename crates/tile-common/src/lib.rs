//! Common types and utilities shared across the weather tile workspace.

pub mod bbox;
pub mod error;
pub mod layer;
pub mod tile;

pub use bbox::GeoBounds;
pub use error::{TileError, TileResult};
pub use layer::LayerKind;
pub use tile::{latlon_to_tile, tile_to_bounds, TileAddress, MAX_ZOOM, TILE_SIZE};

//! Raster rendering for weather tiles.
//!
//! - [`color`]: per-layer value → RGBA color scales
//! - [`raster`]: the fixed-size tile image
//! - [`rasterizer`]: grid sampling and block painting
//! - [`png`]: PNG encoding and decoding

pub mod color;
pub mod png;
pub mod raster;
pub mod rasterizer;

pub use color::{LayerColor, Rgba};
pub use raster::RasterImage;
pub use rasterizer::{RasterizerConfig, RenderStats, TileRasterizer};

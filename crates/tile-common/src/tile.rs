//! Slippy-map tile addressing and Web Mercator tile bounds.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::{GeoBounds, LayerKind, TileError, TileResult};

/// Edge length of every rendered tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level accepted. Keeps `2^z` and `x + 1` inside `u32`.
pub const MAX_ZOOM: u32 = 30;

/// Latitude limit of the Web Mercator projection, `atan(sinh(π))` in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A validated (layer, z, x, y) tile address. One cacheable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub layer: LayerKind,
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileAddress {
    /// Create an address, rejecting coordinates outside the zoom level's grid.
    pub fn new(layer: LayerKind, z: u32, x: u32, y: u32) -> TileResult<Self> {
        validate_tile(z, x, y)?;
        Ok(Self { layer, z, x, y })
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}/{}", self.layer, self.z, self.x, self.y)
    }

    /// File name used by the on-disk tile cache.
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}_{}.png", self.layer, self.z, self.x, self.y)
    }

    /// Parse a disk cache file name back into an address.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".png")?;
        let mut parts = stem.rsplitn(4, '_');
        let y = parts.next()?.parse().ok()?;
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        let layer = parts.next()?.parse().ok()?;
        Self::new(layer, z, x, y).ok()
    }

    /// Geographic bounds covered by this tile.
    pub fn bounds(&self) -> GeoBounds {
        corner_bounds(self.z, self.x, self.y)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

fn validate_tile(z: u32, x: u32, y: u32) -> TileResult<()> {
    if z > MAX_ZOOM {
        return Err(TileError::invalid_address(
            z,
            x,
            y,
            format!("zoom must be <= {}", MAX_ZOOM),
        ));
    }
    let n = 1u64 << z;
    if u64::from(x) >= n || u64::from(y) >= n {
        return Err(TileError::invalid_address(
            z,
            x,
            y,
            format!("x and y must be < {} at zoom {}", n, z),
        ));
    }
    Ok(())
}

/// Longitude of the western edge of tile column `x`.
fn tile_lon(x: u64, n: f64) -> f64 {
    x as f64 / n * 360.0 - 180.0
}

/// Latitude of the northern edge of tile row `y`.
fn tile_lat(y: u64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y as f64 / n))
        .sinh()
        .atan()
        .to_degrees()
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

fn corner_bounds(z: u32, x: u32, y: u32) -> GeoBounds {
    let n = (1u64 << z) as f64;
    let (x, y) = (u64::from(x), u64::from(y));

    GeoBounds {
        north: tile_lat(y, n),
        south: tile_lat(y + 1, n),
        east: tile_lon(x + 1, n),
        west: tile_lon(x, n),
    }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
///
/// Evaluates the inverse projection at the tile's north-west `(x, y)` and
/// south-east `(x + 1, y + 1)` corners.
pub fn tile_to_bounds(z: u32, x: u32, y: u32) -> TileResult<GeoBounds> {
    validate_tile(z, x, y)?;
    Ok(corner_bounds(z, x, y))
}

/// Convert lat/lon to the Web Mercator tile containing it (x, y).
///
/// Latitudes beyond the projection limit are clamped to the edge rows.
pub fn latlon_to_tile(lat: f64, lon: f64, z: u32) -> TileResult<(u32, u32)> {
    if z > MAX_ZOOM {
        return Err(TileError::invalid_address(z, 0, 0, "zoom out of range"));
    }
    let n = (1u64 << z) as f64;
    let max_index = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index);

    Ok((x as u32, y as u32))
}

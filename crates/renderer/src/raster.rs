//! Fixed-size RGBA tile raster.

use bytes::Bytes;
use std::fmt;
use std::sync::OnceLock;

use tile_common::{TileError, TileResult, TILE_SIZE};

use crate::color::Rgba;
use crate::png::{self, PngError};

const SIDE: usize = TILE_SIZE as usize;

/// A `TILE_SIZE × TILE_SIZE` RGBA image, row-major, 4 bytes per pixel.
///
/// Starts fully transparent. Once rendered it is shared read-only behind an
/// `Arc`, so the PNG encoding is computed at most once and memoized.
#[derive(Clone)]
pub struct RasterImage {
    pixels: Vec<u8>,
    png: OnceLock<Bytes>,
}

impl RasterImage {
    pub fn new() -> Self {
        Self {
            pixels: vec![0u8; SIDE * SIDE * 4],
            png: OnceLock::new(),
        }
    }

    /// Wrap an existing RGBA buffer. It must be exactly one tile in size.
    pub fn from_rgba(width: usize, height: usize, pixels: Vec<u8>) -> TileResult<Self> {
        if width != SIDE || height != SIDE || pixels.len() != SIDE * SIDE * 4 {
            return Err(TileError::RenderFailure(format!(
                "expected a {}x{} RGBA buffer, got {}x{} with {} bytes",
                SIDE,
                SIDE,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            png: OnceLock::new(),
        })
    }

    /// Decode a PNG produced by [`RasterImage::encode_png`]. The input bytes
    /// are kept as the image's encoding.
    pub fn from_png(bytes: Bytes) -> TileResult<Self> {
        let (width, height, pixels) =
            png::decode_png(&bytes).map_err(|e| TileError::Cache(e.to_string()))?;
        let image =
            Self::from_rgba(width, height, pixels).map_err(|e| TileError::Cache(e.to_string()))?;
        let _ = image.png.set(bytes);
        Ok(image)
    }

    pub fn width(&self) -> usize {
        SIDE
    }

    pub fn height(&self) -> usize {
        SIDE
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Color at `(x, y)`, or `None` outside the tile.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= SIDE || y >= SIDE {
            return None;
        }
        let i = (y * SIDE + x) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }

    /// Paint an axis-aligned rectangle, clipped to the tile.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, color: Rgba) {
        let x_end = (x + width).min(SIDE);
        let y_end = (y + height).min(SIDE);
        if x >= x_end || y >= y_end {
            return;
        }

        self.png = OnceLock::new();
        let bytes = color.to_array();
        for row in y..y_end {
            let start = (row * SIDE + x) * 4;
            let end = (row * SIDE + x_end) * 4;
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    /// True when every pixel has zero alpha.
    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// PNG encoding of the image, computed on first use.
    pub fn encode_png(&self) -> TileResult<Bytes> {
        if let Some(encoded) = self.png.get() {
            return Ok(encoded.clone());
        }
        let encoded = png::create_png_auto(&self.pixels, SIDE, SIDE)
            .map(Bytes::from)
            .map_err(|e: PngError| TileError::RenderFailure(e.to_string()))?;
        let _ = self.png.set(encoded.clone());
        Ok(encoded)
    }
}

impl PartialEq for RasterImage {
    fn eq(&self, other: &Self) -> bool {
        self.pixels == other.pixels
    }
}

impl Eq for RasterImage {}

impl Default for RasterImage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &SIDE)
            .field("height", &SIDE)
            .finish_non_exhaustive()
    }
}

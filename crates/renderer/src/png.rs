//! PNG encoding for RGBA tiles.
//!
//! Weather tiles are painted from a handful of grid cells, so they almost
//! always fit in a 256-entry palette. Two encoding modes:
//! - **Indexed PNG (color type 3)** when the image has ≤256 unique colors.
//! - **RGBA PNG (color type 6)** otherwise.
//!
//! Decoding (used when reloading tiles persisted on disk) goes through the
//! `image` crate.

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Write;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

#[derive(Debug, thiserror::Error)]
pub enum PngError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("PNG decode failed: {0}")]
    Decode(String),
}

/// An image's distinct colors and, per pixel, the index into them.
struct Palette {
    colors: Vec<[u8; 4]>,
    indices: Vec<u8>,
}

#[inline(always)]
fn pack_color(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

/// Create a PNG image with automatic format selection.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_buffer(pixels, width, height)?;

    let palette = if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette {
        Some(palette) => create_png_indexed(width, height, &palette.colors, &palette.indices),
        None => create_png(pixels, width, height),
    }
}

fn check_buffer(pixels: &[u8], width: usize, height: usize) -> Result<(), PngError> {
    let expected = width * height * 4;
    if pixels.len() != expected {
        return Err(PngError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<Palette> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut colors = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let index = match lookup.get(&pack_color(px)) {
            Some(&idx) => idx,
            None => {
                if colors.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = colors.len() as u8;
                colors.push([px[0], px[1], px[2], px[3]]);
                lookup.insert(pack_color(px), idx);
                idx
            }
        };
        indices.push(index);
    }

    Some(Palette { colors, indices })
}

/// Collect distinct colors per chunk in parallel, merge, then map pixels to
/// indices in parallel.
fn extract_palette_parallel(pixels: &[u8]) -> Option<Palette> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let distinct = pixels
        .par_chunks(chunk_pixels * 4)
        .map(|chunk| {
            let mut seen = HashSet::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                seen.insert(pack_color(px));
                if seen.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            seen
        })
        .reduce(HashSet::new, |mut a, b| {
            a.extend(b);
            a
        });

    if distinct.len() > MAX_PALETTE_SIZE {
        return None;
    }

    // Sorted so the palette order is deterministic across runs.
    let mut packed: Vec<u32> = distinct.into_iter().collect();
    packed.sort_unstable();

    let lookup: HashMap<u32, u8> = packed
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i as u8))
        .collect();
    let colors = packed.iter().map(|c| c.to_le_bytes()).collect();

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_pixels * 4))
        .for_each(|(out, px_chunk)| {
            for (idx, px) in out.iter_mut().zip(px_chunk.chunks_exact(4)) {
                *idx = lookup.get(&pack_color(px)).copied().unwrap_or(0);
            }
        });

    Some(Palette { colors, indices })
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>, PngError> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // tRNS only when some entry is not fully opaque
    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_buffer(pixels, width, height)?;

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    let idat = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Decode PNG bytes into `(width, height, rgba pixels)`.
pub fn decode_png(bytes: &[u8]) -> Result<(usize, usize, Vec<u8>), PngError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| PngError::Decode(e.to_string()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok((w as usize, h as usize, img.into_raw()))
}

fn ihdr(width: usize, height: usize, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    data[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods all 0
    data
}

/// Prefix every scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>, PngError> {
    let mut raw = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

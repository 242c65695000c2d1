//! Tile rasterization: sample a grid over a tile and paint it.

use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use tile_common::{GeoBounds, LayerKind, TileAddress, TileError, TileResult, TILE_SIZE};
use weather_source::{SharedSampleSource, WeatherSample};

use crate::color::LayerColor;
use crate::raster::RasterImage;

/// Sampling limits for a single tile render.
#[derive(Debug, Clone)]
pub struct RasterizerConfig {
    /// Upper bound on in-flight sample requests per render
    pub max_concurrent_samples: usize,
    /// Per-sample deadline; a sample that misses it counts as failed
    pub sample_timeout: Duration,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_samples: 4,
            sample_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome counts for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Samples per grid side
    pub grid_size: usize,
    pub samples_ok: usize,
    pub samples_failed: usize,
    pub elapsed: Duration,
}

impl RenderStats {
    pub fn samples_total(&self) -> usize {
        self.samples_ok + self.samples_failed
    }
}

/// One grid sample position: row `i`, column `j`, and where it lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub row: usize,
    pub col: usize,
    pub lat: f64,
    pub lon: f64,
}

/// Samples per tile side at zoom `z`.
pub fn grid_size(z: u32) -> usize {
    if z > 6 {
        8
    } else {
        4
    }
}

/// Sample positions for an `n × n` grid spanning `bounds` edge to edge.
///
/// Row 0 sits on the northern edge and column 0 on the western edge. A
/// single-sample grid uses the center.
pub fn sample_points(bounds: &GeoBounds, n: usize) -> Vec<SamplePoint> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        let (lat, lon) = bounds.center();
        return vec![SamplePoint {
            row: 0,
            col: 0,
            lat,
            lon,
        }];
    }

    let denom = (n - 1) as f64;
    let mut points = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let (lat, lon) = bounds.interpolate(row as f64 / denom, col as f64 / denom);
            points.push(SamplePoint { row, col, lat, lon });
        }
    }
    points
}

/// Turns a tile address into an image by sampling a [`WeatherSampleSource`]
/// across the tile.
///
/// [`WeatherSampleSource`]: weather_source::WeatherSampleSource
pub struct TileRasterizer {
    source: SharedSampleSource,
    config: RasterizerConfig,
}

impl TileRasterizer {
    pub fn new(source: SharedSampleSource, config: RasterizerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &RasterizerConfig {
        &self.config
    }

    pub fn source(&self) -> &SharedSampleSource {
        &self.source
    }

    /// Render `(layer, z, x, y)`. Invalid coordinates fail before any sampling.
    pub async fn render(&self, layer: LayerKind, z: u32, x: u32, y: u32) -> TileResult<RasterImage> {
        let address = TileAddress::new(layer, z, x, y)?;
        self.render_with_stats(&address).await.map(|(image, _)| image)
    }

    /// Render an already validated address, reporting sample outcomes.
    #[instrument(skip(self, address), fields(tile = %address))]
    pub async fn render_with_stats(&self, address: &TileAddress) -> TileResult<(RasterImage, RenderStats)> {
        let started = Instant::now();
        let n = grid_size(address.z);
        let points = sample_points(&address.bounds(), n);

        let samples = self.sample_all(points).await;

        let mut image = RasterImage::new();
        let cell = TILE_SIZE as usize / n;
        let mut stats = RenderStats {
            grid_size: n,
            ..Default::default()
        };

        for (point, result) in samples {
            match result {
                Ok(sample) => {
                    stats.samples_ok += 1;
                    let color = address.layer.color_for(&sample);
                    image.fill_rect(cell * point.col, cell * point.row, cell, cell, color);
                }
                Err(e) => {
                    stats.samples_failed += 1;
                    debug!(lat = point.lat, lon = point.lon, error = %e, "Sample failed, leaving cell empty");
                }
            }
        }
        stats.elapsed = started.elapsed();

        if stats.samples_ok == 0 {
            warn!(
                samples = stats.samples_failed,
                source = self.source.name(),
                "Every sample failed, tile is fully transparent"
            );
        } else {
            debug!(
                ok = stats.samples_ok,
                failed = stats.samples_failed,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "Tile rasterized"
            );
        }

        Ok((image, stats))
    }

    /// Fetch every point with bounded concurrency. One failure never
    /// cancels its siblings.
    async fn sample_all(
        &self,
        points: Vec<SamplePoint>,
    ) -> Vec<(SamplePoint, TileResult<WeatherSample>)> {
        let limit = self.config.max_concurrent_samples.max(1);
        let timeout = self.config.sample_timeout;

        stream::iter(points)
            .map(|point| {
                let source = self.source.clone();
                async move {
                    let result = match tokio::time::timeout(timeout, source.sample(point.lat, point.lon)).await {
                        Ok(result) => result,
                        Err(_) => Err(TileError::UpstreamUnavailable(format!(
                            "sample timed out after {:?}",
                            timeout
                        ))),
                    };
                    (point, result)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_policy() {
        assert_eq!(grid_size(0), 4);
        assert_eq!(grid_size(6), 4);
        assert_eq!(grid_size(7), 8);
        assert_eq!(grid_size(18), 8);
    }

    #[test]
    fn test_sample_points_cover_edges() {
        let bounds = GeoBounds::new(50.0, 40.0, 20.0, 10.0);
        let points = sample_points(&bounds, 4);
        assert_eq!(points.len(), 16);

        let first = points[0];
        assert_eq!((first.lat, first.lon), (50.0, 10.0));
        let last = points[15];
        assert_eq!((last.row, last.col), (3, 3));
        assert_eq!((last.lat, last.lon), (40.0, 20.0));
    }

    #[test]
    fn test_single_sample_uses_center() {
        let bounds = GeoBounds::new(50.0, 40.0, 20.0, 10.0);
        let points = sample_points(&bounds, 1);
        assert_eq!(points.len(), 1);
        assert_eq!((points[0].lat, points[0].lon), (45.0, 15.0));
    }
}

//! End-to-end rasterizer tests against fake sample sources.

use std::sync::Arc;
use std::time::Duration;

use renderer::color::{temperature_color, LayerColor};
use renderer::{RasterizerConfig, Rgba, TileRasterizer};
use test_utils::fixtures::tiles;
use test_utils::{ConstantSource, CountingSource, FailingSource, FnSource};
use tile_common::{LayerKind, TileAddress, TileError};
use weather_source::{SharedSampleSource, WeatherSample};

fn rasterizer(source: SharedSampleSource) -> TileRasterizer {
    TileRasterizer::new(source, RasterizerConfig::default())
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_constant_temperature_fills_every_cell() {
    let r = rasterizer(Arc::new(ConstantSource::temperature(20.0)));
    let (z, x, y) = tiles::CENTRAL_EUROPE_Z5;

    let image = r.render(LayerKind::Temperature, z, x, y).await.unwrap();

    let expected = temperature_color(20.0);
    for py in (0..256).step_by(7) {
        for px in (0..256).step_by(7) {
            assert_eq!(image.pixel(px, py), Some(expected), "pixel ({}, {})", px, py);
        }
    }
    assert_eq!(image.pixel(255, 255), Some(expected));
}

#[tokio::test]
async fn test_grid_size_follows_zoom() {
    for (z, x, y, expected) in [(5, 16, 10, 16), (8, 142, 84, 64)] {
        let source = Arc::new(CountingSource::new(ConstantSource::temperature(0.0)));
        let r = rasterizer(source.clone());
        let address = TileAddress::new(LayerKind::Wind, z, x, y).unwrap();

        let (_, stats) = r.render_with_stats(&address).await.unwrap();
        assert_eq!(source.calls(), expected);
        assert_eq!(stats.samples_ok, expected);
        assert_eq!(stats.samples_total(), expected);
    }
}

#[tokio::test]
async fn test_cells_follow_sample_position() {
    // Temperature tracks latitude, so northern rows are warmer in this tile.
    let source = FnSource::new(|lat, lon| {
        let mut s = WeatherSample::neutral(lat, lon);
        s.temp_c = lat - 20.0;
        Ok(s)
    });
    let r = rasterizer(Arc::new(source));
    let address = TileAddress::new(LayerKind::Temperature, 5, 16, 10).unwrap();
    let bounds = address.bounds();

    let image = r.render(LayerKind::Temperature, 5, 16, 10).await.unwrap();

    // Row 0 samples the north edge, row 3 (pixels 192..256) the south edge.
    assert_eq!(image.pixel(10, 10), Some(temperature_color(bounds.north - 20.0)));
    assert_eq!(image.pixel(10, 250), Some(temperature_color(bounds.south - 20.0)));
    assert_ne!(image.pixel(10, 10), image.pixel(10, 250));
}

// ============================================================================
// Degraded rendering
// ============================================================================

#[tokio::test]
async fn test_total_failure_yields_transparent_tile() {
    let r = rasterizer(Arc::new(FailingSource));
    let address = TileAddress::new(LayerKind::Clouds, 3, 4, 2).unwrap();

    let (image, stats) = r.render_with_stats(&address).await.unwrap();
    assert!(image.is_fully_transparent());
    assert_eq!(image.width(), 256);
    assert_eq!(stats.samples_ok, 0);
    assert_eq!(stats.samples_failed, 16);
}

#[tokio::test]
async fn test_partial_failure_leaves_only_failed_cells_empty() {
    // Fail the western column only.
    let source = FnSource::new(|lat, lon| {
        if lon < -179.0 {
            Err(TileError::UpstreamUnavailable("nope".into()))
        } else {
            Ok(WeatherSample::neutral(lat, lon))
        }
    });
    let r = rasterizer(Arc::new(source));

    let image = r.render(LayerKind::Pressure, 0, 0, 0).await.unwrap();
    assert_eq!(image.pixel(0, 0), Some(Rgba::TRANSPARENT));
    assert_eq!(image.pixel(63, 200), Some(Rgba::TRANSPARENT));
    assert_eq!(
        image.pixel(64, 0),
        Some(LayerKind::Pressure.color_for_value(1013.0))
    );
}

#[tokio::test]
async fn test_slow_samples_time_out() {
    let source = CountingSource::with_delay(ConstantSource::temperature(0.0), Duration::from_secs(5));
    let r = TileRasterizer::new(
        Arc::new(source),
        RasterizerConfig {
            max_concurrent_samples: 16,
            sample_timeout: Duration::from_millis(50),
        },
    );
    let address = TileAddress::new(LayerKind::Temperature, 0, 0, 0).unwrap();

    let (image, stats) = r.render_with_stats(&address).await.unwrap();
    assert!(image.is_fully_transparent());
    assert_eq!(stats.samples_failed, 16);
}

// ============================================================================
// Concurrency limits and validation
// ============================================================================

#[tokio::test]
async fn test_sampling_concurrency_is_bounded() {
    let source = Arc::new(CountingSource::with_delay(
        ConstantSource::temperature(0.0),
        Duration::from_millis(10),
    ));
    let r = TileRasterizer::new(
        source.clone(),
        RasterizerConfig {
            max_concurrent_samples: 3,
            sample_timeout: Duration::from_secs(5),
        },
    );

    r.render(LayerKind::Humidity, 7, 70, 40).await.unwrap();
    assert_eq!(source.calls(), 64);
    assert!(source.peak_in_flight() <= 3, "peak {}", source.peak_in_flight());
}

#[tokio::test]
async fn test_invalid_address_fails_before_sampling() {
    let source = Arc::new(CountingSource::new(ConstantSource::temperature(0.0)));
    let r = rasterizer(source.clone());

    let err = r.render(LayerKind::Temperature, 2, 4, 0).await.unwrap_err();
    assert!(matches!(err, TileError::InvalidTileAddress { .. }));
    assert_eq!(source.calls(), 0);
}

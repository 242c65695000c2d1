//! Property tests for the layer color scales.

use renderer::color::{
    clouds_color, humidity_color, precipitation_color, pressure_color, temperature_color,
    wind_color, LayerColor,
};
use renderer::Rgba;
use tile_common::LayerKind;

/// Evenly spaced values from `low` to `high` inclusive.
fn sweep(low: f64, high: f64, steps: usize) -> Vec<f64> {
    (0..=steps)
        .map(|i| low + (high - low) * i as f64 / steps as f64)
        .collect()
}

// ============================================================================
// Clamping
// ============================================================================

#[test]
fn test_out_of_domain_values_clamp() {
    assert_eq!(temperature_color(-100.0), temperature_color(-40.0));
    assert_eq!(temperature_color(500.0), temperature_color(50.0));
    assert_eq!(wind_color(-3.0), wind_color(0.0));
    assert_eq!(wind_color(99.0), wind_color(30.0));
    assert_eq!(precipitation_color(250.0), precipitation_color(10.0));
    assert_eq!(pressure_color(900.0), pressure_color(980.0));
    assert_eq!(pressure_color(1100.0), pressure_color(1040.0));
    assert_eq!(humidity_color(140.0), humidity_color(100.0));
    assert_eq!(clouds_color(-5.0), Rgba::new(255, 255, 255, 0));
}

#[test]
fn test_infinities_clamp() {
    assert_eq!(temperature_color(f64::INFINITY), temperature_color(50.0));
    assert_eq!(temperature_color(f64::NEG_INFINITY), temperature_color(-40.0));
}

// ============================================================================
// Monotonicity
// ============================================================================

#[test]
fn test_temperature_moves_from_blue_to_red() {
    let colors: Vec<Rgba> = sweep(-60.0, 70.0, 520).into_iter().map(temperature_color).collect();
    for pair in colors.windows(2) {
        assert!(pair[1].r >= pair[0].r, "red fell: {:?}", pair);
        assert!(pair[1].b <= pair[0].b, "blue rose: {:?}", pair);
        assert_eq!(pair[1].a, 128);
    }
}

#[test]
fn test_intensity_scales_are_monotonic() {
    let check = |f: fn(f64) -> Rgba, low: f64, high: f64, key: fn(Rgba) -> u8| {
        let values = sweep(low, high, 400);
        for w in values.windows(2) {
            assert!(key(f(w[1])) >= key(f(w[0])), "not monotonic at {}", w[1]);
        }
    };

    check(wind_color, -5.0, 40.0, |c| c.r);
    check(precipitation_color, -1.0, 15.0, |c| c.a);
    check(pressure_color, 960.0, 1060.0, |c| c.r);
    check(humidity_color, -10.0, 110.0, |c| c.g);
    check(clouds_color, -10.0, 110.0, |c| c.a);
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_every_layer_dispatches_to_its_scale() {
    let value_for = |layer: LayerKind| match layer {
        LayerKind::Temperature => (12.0, temperature_color(12.0)),
        LayerKind::Wind => (7.0, wind_color(7.0)),
        LayerKind::Precipitation => (3.0, precipitation_color(3.0)),
        LayerKind::Pressure => (1000.0, pressure_color(1000.0)),
        LayerKind::Humidity => (64.0, humidity_color(64.0)),
        LayerKind::Clouds => (20.0, clouds_color(20.0)),
    };

    for layer in LayerKind::ALL {
        let (value, expected) = value_for(layer);
        assert_eq!(layer.color_for_value(value), expected, "layer {}", layer);
    }
}

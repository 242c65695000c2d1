//! Layer color scales.
//!
//! Every layer maps a single physical value to an RGBA color through a
//! clamped linear normalization. Channel bytes are truncated, not rounded,
//! so a value exactly at a scale stop lands on the lower byte.

use serde::{Deserialize, Serialize};

use tile_common::LayerKind;
use weather_source::WeatherSample;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Alpha used by every semi-transparent overlay layer.
const OVERLAY_ALPHA: u8 = 128;

/// Map `value` into [0, 1] over `[low, low + span]`. NaN maps to 0.
fn normalize(value: f64, low: f64, span: f64) -> f64 {
    let n = (value - low) / span;
    if n.is_nan() {
        0.0
    } else {
        n.clamp(0.0, 1.0)
    }
}

/// Scale a fraction in [0, 1] to a channel byte, truncating.
#[inline]
fn byte(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 255.0) as u8
}

/// Temperature color scale (Celsius), -40 °C to 50 °C.
///
/// Four equal segments: blue → cyan → green → yellow → red.
pub fn temperature_color(temp_c: f64) -> Rgba {
    let n = normalize(temp_c, -40.0, 90.0);

    let (r, g, b) = if n < 0.25 {
        let t = n / 0.25;
        (0, byte(t), 255)
    } else if n < 0.5 {
        let t = (n - 0.25) / 0.25;
        (0, 255, byte(1.0 - t))
    } else if n < 0.75 {
        let t = (n - 0.5) / 0.25;
        (byte(t), 255, 0)
    } else {
        let t = (n - 0.75) / 0.25;
        (255, byte(1.0 - t), 0)
    };

    Rgba::new(r, g, b, OVERLAY_ALPHA)
}

/// Wind speed color scale (m/s), 0 to 30: green fading to red.
pub fn wind_color(speed_ms: f64) -> Rgba {
    let n = normalize(speed_ms, 0.0, 30.0);
    Rgba::new(byte(n), byte(1.0 - n), 0, OVERLAY_ALPHA)
}

/// Precipitation (mm), 0 to 10: pure blue whose opacity tracks intensity.
pub fn precipitation_color(precip_mm: f64) -> Rgba {
    let n = normalize(precip_mm, 0.0, 10.0);
    Rgba::new(0, 0, 255, byte(n))
}

/// Pressure color scale (mb), 980 to 1040: blue (low) to red (high).
pub fn pressure_color(pressure_mb: f64) -> Rgba {
    let n = normalize(pressure_mb, 980.0, 60.0);
    Rgba::new(byte(n), 0, byte(1.0 - n), OVERLAY_ALPHA)
}

/// Relative humidity (%): blue gaining green as humidity rises.
pub fn humidity_color(humidity_pct: f64) -> Rgba {
    let n = normalize(humidity_pct, 0.0, 100.0);
    Rgba::new(0, byte(n), 255, OVERLAY_ALPHA)
}

/// Cloud cover (%): white whose opacity tracks coverage.
pub fn clouds_color(cloud_pct: f64) -> Rgba {
    let n = normalize(cloud_pct, 0.0, 100.0);
    Rgba::new(255, 255, 255, byte(n))
}

/// Per-layer dispatch from a weather sample to a color.
pub trait LayerColor {
    /// The value this layer reads from a sample, in the unit of its scale.
    fn channel(&self, sample: &WeatherSample) -> f64;

    /// Color for a raw value of this layer's channel.
    fn color_for_value(&self, value: f64) -> Rgba;

    /// Color for a whole sample.
    fn color_for(&self, sample: &WeatherSample) -> Rgba {
        self.color_for_value(self.channel(sample))
    }
}

impl LayerColor for LayerKind {
    fn channel(&self, sample: &WeatherSample) -> f64 {
        match self {
            LayerKind::Temperature => sample.temp_c,
            LayerKind::Wind => sample.wind_ms(),
            LayerKind::Precipitation => sample.precip_mm,
            LayerKind::Pressure => sample.pressure_mb,
            LayerKind::Humidity => sample.humidity_pct,
            LayerKind::Clouds => sample.cloud_pct,
        }
    }

    fn color_for_value(&self, value: f64) -> Rgba {
        let color_fn: fn(f64) -> Rgba = match self {
            LayerKind::Temperature => temperature_color,
            LayerKind::Wind => wind_color,
            LayerKind::Precipitation => precipitation_color,
            LayerKind::Pressure => pressure_color,
            LayerKind::Humidity => humidity_color,
            LayerKind::Clouds => clouds_color,
        };
        color_fn(value)
    }
}

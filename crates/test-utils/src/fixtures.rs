//! Common test fixtures for the weather tile workspace.

use serde_json::{json, Value};

/// Tile addresses with known geometry.
pub mod tiles {
    /// z=5 tile spanning 0°..11.25°E, ~48.9°..55.8°N (central Europe).
    pub const CENTRAL_EUROPE_Z5: (u32, u32, u32) = (5, 16, 10);

    /// The single world tile.
    pub const WORLD: (u32, u32, u32) = (0, 0, 0);

    /// z=8 tile containing Warsaw, above the coarse-grid zoom threshold.
    pub const WARSAW_Z8: (u32, u32, u32) = (8, 142, 84);
}

/// Reference points.
pub mod points {
    pub const WARSAW: (f64, f64) = (52.2297, 21.0122);
    pub const NULL_ISLAND: (f64, f64) = (0.0, 0.0);
}

/// Fresh temporary directory for a disk tile cache. Removed on drop.
pub fn temp_cache_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("tile-cache-")
        .tempdir()
        .expect("create temp cache dir")
}

/// A complete `current.json` response body.
pub fn current_payload(temp_c: f64, wind_kph: f64, cloud: f64) -> Value {
    json!({
        "location": {
            "name": "Warsaw",
            "country": "Poland",
            "lat": 52.23,
            "lon": 21.01,
            "localtime_epoch": 1_700_000_000
        },
        "current": {
            "last_updated_epoch": 1_700_000_000,
            "temp_c": temp_c,
            "condition": {"text": "Overcast", "code": 1009},
            "wind_kph": wind_kph,
            "wind_degree": 225,
            "wind_dir": "SW",
            "pressure_mb": 1004.0,
            "precip_mm": 1.2,
            "humidity": 88,
            "cloud": cloud,
            "vis_km": 6.0
        }
    })
}

/// A 200 body carrying only a temperature.
pub fn partial_payload(temp_c: f64) -> Value {
    json!({"current": {"temp_c": temp_c}})
}

/// A `forecast.json` body with `days` consecutive days starting
/// 2024-03-04 (a Monday). Day `i` has min `i` and max `i + 10` °C.
pub fn forecast_payload(days: usize) -> Value {
    let forecastday: Vec<Value> = (0..days)
        .map(|i| {
            json!({
                "date": format!("2024-03-{:02}", 4 + i),
                "day": {
                    "mintemp_c": i as f64,
                    "maxtemp_c": i as f64 + 10.0,
                    "avghumidity": 70,
                    "maxwind_kph": 18.0,
                    "daily_chance_of_rain": 20,
                    "condition": {"text": "Partly cloudy", "icon": "//cdn/116.png"}
                },
                "hour": [{"time": "00:00", "pressure_mb": 1012.0}]
            })
        })
        .collect();

    json!({
        "location": {"name": "Warsaw", "lat": 52.23, "lon": 21.01},
        "current": {"temp_c": 4.0},
        "forecast": {"forecastday": forecastday}
    })
}

/// The shape WeatherAPI uses for error bodies (e.g. bad key).
pub fn error_payload() -> Value {
    json!({"error": {"code": 2006, "message": "API key is invalid."}})
}

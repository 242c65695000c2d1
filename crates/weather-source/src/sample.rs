//! Point weather observation and upstream payload decoding.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Neutral values substituted for fields the upstream payload omits.
pub mod defaults {
    pub const TEMP_C: f64 = 0.0;
    pub const WIND_KPH: f64 = 0.0;
    pub const WIND_DEGREE: f64 = 0.0;
    pub const PRECIP_MM: f64 = 0.0;
    pub const PRESSURE_MB: f64 = 1013.0;
    pub const HUMIDITY_PCT: f64 = 50.0;
    pub const CLOUD_PCT: f64 = 0.0;
    pub const VISIBILITY_KM: f64 = 10.0;
}

/// Current conditions at one point. Fetched per render, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub lat: f64,
    pub lon: f64,
    pub temp_c: f64,
    pub wind_kph: f64,
    pub wind_degree: f64,
    pub precip_mm: f64,
    pub pressure_mb: f64,
    pub humidity_pct: f64,
    pub cloud_pct: f64,
    pub visibility_km: f64,
    pub condition_text: String,
    pub observed_at: DateTime<Utc>,
}

impl WeatherSample {
    /// A sample where every physical quantity holds its neutral default.
    pub fn neutral(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            temp_c: defaults::TEMP_C,
            wind_kph: defaults::WIND_KPH,
            wind_degree: defaults::WIND_DEGREE,
            precip_mm: defaults::PRECIP_MM,
            pressure_mb: defaults::PRESSURE_MB,
            humidity_pct: defaults::HUMIDITY_PCT,
            cloud_pct: defaults::CLOUD_PCT,
            visibility_km: defaults::VISIBILITY_KM,
            condition_text: String::new(),
            observed_at: Utc::now(),
        }
    }

    /// Decode a WeatherAPI.com `current.json` response body.
    ///
    /// Never fails: a missing `current` object, a missing field, or a field
    /// of the wrong type each fall back to the neutral default.
    pub fn from_current_json(lat: f64, lon: f64, body: &Value) -> Self {
        let mut sample = Self::neutral(lat, lon);
        let Some(current) = body.get("current") else {
            return sample;
        };

        let number = |key: &str, default: f64| {
            current
                .get(key)
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };

        sample.temp_c = number("temp_c", defaults::TEMP_C);
        sample.wind_kph = number("wind_kph", defaults::WIND_KPH);
        sample.wind_degree = number("wind_degree", defaults::WIND_DEGREE);
        sample.precip_mm = number("precip_mm", defaults::PRECIP_MM);
        sample.pressure_mb = number("pressure_mb", defaults::PRESSURE_MB);
        sample.humidity_pct = number("humidity", defaults::HUMIDITY_PCT);
        sample.cloud_pct = number("cloud", defaults::CLOUD_PCT);
        sample.visibility_km = number("vis_km", defaults::VISIBILITY_KM);

        if let Some(text) = current
            .get("condition")
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
        {
            sample.condition_text = text.to_string();
        }

        if let Some(observed) = current
            .get("last_updated_epoch")
            .and_then(Value::as_i64)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        {
            sample.observed_at = observed;
        }

        sample
    }

    /// Wind speed converted from km/h to m/s.
    pub fn wind_ms(&self) -> f64 {
        self.wind_kph / 3.6
    }
}

//! Daily forecasts from the upstream `forecast.json` endpoint.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use tile_common::{TileError, TileResult};

/// Days requested when the client does not say.
pub const DEFAULT_FORECAST_DAYS: u8 = 7;

/// Upper bound the upstream accepts.
pub const MAX_FORECAST_DAYS: u8 = 14;

/// One forecast day, flattened from the upstream `forecastday` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// English weekday name, e.g. "Monday"
    pub day_name: String,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: f64,
    /// Pressure of the first hourly entry; the upstream has no daily value
    pub pressure_mb: f64,
    pub max_wind_kph: f64,
    pub condition_text: String,
    pub condition_icon: String,
    pub chance_of_rain_pct: f64,
}

impl ForecastDay {
    /// Build from one `forecast.forecastday[]` element. Missing numeric
    /// fields take the same neutral values as current conditions; an entry
    /// without a parsable date is rejected.
    pub fn from_json(day: &Value) -> Option<Self> {
        let date = day
            .get("date")
            .and_then(Value::as_str)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())?;

        let summary = day.get("day").unwrap_or(&Value::Null);
        let number = |key: &str, default: f64| {
            summary.get(key).and_then(Value::as_f64).unwrap_or(default)
        };
        let condition = summary.get("condition").unwrap_or(&Value::Null);
        let text = |key: &str| {
            condition
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let pressure_mb = day
            .get("hour")
            .and_then(|hours| hours.get(0))
            .and_then(|hour| hour.get("pressure_mb"))
            .and_then(Value::as_f64)
            .unwrap_or(1013.0);

        Some(Self {
            date,
            day_name: date.format("%A").to_string(),
            temp_min_c: number("mintemp_c", 0.0),
            temp_max_c: number("maxtemp_c", 0.0),
            humidity_pct: number("avghumidity", 50.0),
            pressure_mb,
            max_wind_kph: number("maxwind_kph", 0.0),
            condition_text: text("text"),
            condition_icon: text("icon"),
            chance_of_rain_pct: number("daily_chance_of_rain", 0.0),
        })
    }
}

/// Extract the day list from a full `forecast.json` body.
///
/// A body without `forecast.forecastday` is an upstream fault. Individual
/// days with a bad date are dropped.
pub fn parse_forecast(body: &Value) -> TileResult<Vec<ForecastDay>> {
    let days = body
        .get("forecast")
        .and_then(|f| f.get("forecastday"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TileError::UpstreamUnavailable("forecast payload has no forecastday list".into())
        })?;

    let parsed: Vec<ForecastDay> = days.iter().filter_map(ForecastDay::from_json).collect();
    if parsed.len() < days.len() {
        debug!(
            dropped = days.len() - parsed.len(),
            "Dropped forecast days without a valid date"
        );
    }
    Ok(parsed)
}

/// Multi-day forecast for a point.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// `days` is between 1 and [`MAX_FORECAST_DAYS`].
    async fn forecast(&self, lat: f64, lon: f64, days: u8) -> TileResult<Vec<ForecastDay>>;
}

pub type SharedForecastSource = Arc<dyn ForecastSource>;

#[async_trait]
impl<S: ForecastSource + ?Sized> ForecastSource for Arc<S> {
    async fn forecast(&self, lat: f64, lon: f64, days: u8) -> TileResult<Vec<ForecastDay>> {
        (**self).forecast(lat, lon, days).await
    }
}

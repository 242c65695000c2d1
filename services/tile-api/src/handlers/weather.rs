//! Point, forecast and vector JSON endpoints backed directly by the
//! upstream sources.

use axum::{
    extract::{Extension, Query},
    Json,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use tile_common::{GeoBounds, TileError};
use weather_source::{
    ForecastDay, ForecastSource, WeatherSample, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS,
};

use super::common::{parse_param, ApiResult};
use crate::state::AppState;

pub const DEFAULT_LAT: f64 = 52.2297;
pub const DEFAULT_LON: f64 = 21.0122;

/// `west,south,east,north` used when the client sends no bounds.
pub const DEFAULT_WIND_BOUNDS: &str = "14,49,24,55";

/// Spacing of the wind-vector lattice in degrees.
pub const WIND_LATTICE_STEP: usize = 2;

/// Upper bound on lattice points per request; each one is an upstream call.
pub const MAX_WIND_POINTS: usize = 400;

#[derive(Debug, Deserialize)]
pub struct CurrentParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Coordinates from optional query values, defaulting to Warsaw.
fn coordinates(lat: Option<&str>, lon: Option<&str>) -> Result<(f64, f64), TileError> {
    let lat = match lat {
        Some(raw) => parse_param("lat", raw)?,
        None => DEFAULT_LAT,
    };
    let lon = match lon {
        Some(raw) => parse_param("lon", raw)?,
        None => DEFAULT_LON,
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(TileError::InvalidParameter {
            param: "lat,lon".to_string(),
            message: format!("({}, {}) is not a valid coordinate", lat, lon),
        });
    }
    Ok((lat, lon))
}

/// GET /api/weather/current?lat=&lon=
#[instrument(skip(state))]
pub async fn current_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CurrentParams>,
) -> ApiResult<Json<WeatherSample>> {
    let (lat, lon) = coordinates(params.lat.as_deref(), params.lon.as_deref())?;
    let sample = state.source.sample(lat, lon).await?;
    Ok(Json(sample))
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub days: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub lat: f64,
    pub lon: f64,
    pub days: Vec<ForecastDay>,
}

/// GET /api/weather/forecast?lat=&lon=&days=
#[instrument(skip(state))]
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> ApiResult<Json<ForecastResponse>> {
    let (lat, lon) = coordinates(params.lat.as_deref(), params.lon.as_deref())?;
    let days: u8 = match params.days.as_deref() {
        Some(raw) => parse_param("days", raw)?,
        None => DEFAULT_FORECAST_DAYS,
    };
    if !(1..=MAX_FORECAST_DAYS).contains(&days) {
        return Err(TileError::InvalidParameter {
            param: "days".to_string(),
            message: format!("must be between 1 and {}", MAX_FORECAST_DAYS),
        }
        .into());
    }

    let source = state.forecast.as_ref().ok_or_else(|| {
        TileError::UpstreamUnavailable("no forecast source configured".to_string())
    })?;
    let days = source.forecast(lat, lon, days).await?;
    Ok(Json(ForecastResponse { lat, lon, days }))
}

#[derive(Debug, Deserialize)]
pub struct WindVectorParams {
    /// `west,south,east,north`
    pub bounds: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindVector {
    pub lat: f64,
    pub lon: f64,
    /// m/s
    pub speed: f64,
    /// Degrees, meteorological convention (direction the wind blows from)
    pub direction: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WindVectorsResponse {
    pub vectors: Vec<WindVector>,
}

/// Integer lattice points inside `bounds`, `step` degrees apart, starting at
/// the truncated south-west corner. North and east edges are exclusive.
pub fn wind_lattice(bounds: &GeoBounds, step: usize) -> Vec<(f64, f64)> {
    let (south, north) = (bounds.south.trunc() as i64, bounds.north.trunc() as i64);
    let (west, east) = (bounds.west.trunc() as i64, bounds.east.trunc() as i64);

    let mut points = Vec::new();
    for lat in (south..north).step_by(step.max(1)) {
        for lon in (west..east).step_by(step.max(1)) {
            points.push((lat as f64, lon as f64));
        }
    }
    points
}

/// GET /api/weather/wind-vectors?bounds=w,s,e,n
#[instrument(skip(state))]
pub async fn wind_vectors_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<WindVectorParams>,
) -> ApiResult<Json<WindVectorsResponse>> {
    let raw = params.bounds.as_deref().unwrap_or(DEFAULT_WIND_BOUNDS);
    let bounds = GeoBounds::from_bbox_param(raw).map_err(TileError::from)?;

    let points = wind_lattice(&bounds, WIND_LATTICE_STEP);
    if points.len() > MAX_WIND_POINTS {
        return Err(TileError::InvalidParameter {
            param: "bounds".to_string(),
            message: format!(
                "{} lattice points requested, at most {} allowed",
                points.len(),
                MAX_WIND_POINTS
            ),
        }
        .into());
    }

    let source = state.source.clone();
    let concurrency = state.config.sampling.concurrency.max(1);
    let vectors: Vec<WindVector> = stream::iter(points)
        .map(|(lat, lon)| {
            let source = source.clone();
            async move {
                match source.sample(lat, lon).await {
                    Ok(sample) => Some(WindVector {
                        lat,
                        lon,
                        speed: sample.wind_ms(),
                        direction: sample.wind_degree,
                    }),
                    Err(e) => {
                        debug!(lat, lon, error = %e, "Skipping wind vector point");
                        None
                    }
                }
            }
        })
        .buffered(concurrency)
        .filter_map(|v| async move { v })
        .collect()
        .await;

    Ok(Json(WindVectorsResponse { vectors }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lattice() {
        let bounds = GeoBounds::from_bbox_param(DEFAULT_WIND_BOUNDS).unwrap();
        let points = wind_lattice(&bounds, WIND_LATTICE_STEP);

        // lat 49,51,53 x lon 14,16,18,20,22
        assert_eq!(points.len(), 15);
        assert_eq!(points[0], (49.0, 14.0));
        assert_eq!(points[points.len() - 1], (53.0, 22.0));
    }

    #[test]
    fn test_fractional_bounds_truncate() {
        let bounds = GeoBounds::new(3.9, 0.5, 4.2, 0.7);
        let points = wind_lattice(&bounds, 2);
        assert_eq!(points, vec![(0.0, 0.0), (0.0, 2.0), (2.0, 0.0), (2.0, 2.0)]);
    }

    #[test]
    fn test_degenerate_bounds_are_empty() {
        let bounds = GeoBounds::new(10.5, 10.1, 20.0, 20.0);
        assert!(wind_lattice(&bounds, 2).is_empty());
    }
}

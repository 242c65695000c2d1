//! HTTP request handlers.
//!
//! - `tiles`: PNG tile endpoint
//! - `weather`: current conditions, forecasts and wind vectors
//! - `api`: service config, health, metrics
//! - `common`: error responses and parameter parsing

pub mod api;
pub mod common;
pub mod tiles;
pub mod weather;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

pub use api::{api_metrics_handler, config_handler, health_handler, metrics_handler};
pub use common::{ApiError, ApiResult};
pub use tiles::{tile_handler, TILE_CACHE_HEADER};
pub use weather::{
    current_handler, forecast_handler, wind_vectors_handler, ForecastResponse, WindVector,
    WindVectorsResponse,
};

/// All routes with state attached. Middleware is added by the binary.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/weather/wind-vectors", get(wind_vectors_handler))
        .route("/api/weather/current", get(current_handler))
        .route("/api/weather/forecast", get(forecast_handler))
        .route("/api/weather/:layer/:z/:x/:tile", get(tile_handler))
        .route("/api/config", get(config_handler))
        .route("/api/metrics", get(api_metrics_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(state))
}

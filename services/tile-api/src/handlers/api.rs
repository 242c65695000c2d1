//! Service info, health and metrics endpoints.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use tile_common::{LayerKind, MAX_ZOOM, TILE_SIZE};

use crate::state::AppState;

/// GET /health - Basic health check
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /api/config - Service description for map clients
#[instrument(skip(state))]
pub async fn config_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let layers: Vec<_> = LayerKind::ALL
        .iter()
        .map(|layer| {
            json!({
                "name": layer.name(),
                "unit": layer.unit(),
                "url": format!("/api/weather/{}/{{z}}/{{x}}/{{y}}.png", layer.name()),
            })
        })
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "source": state.source.name(),
        "tile_size": TILE_SIZE,
        "max_zoom": MAX_ZOOM,
        "weather_layers": layers,
        "cache": {
            "store": state.pipeline.store().name(),
            "ttl_secs": state.config.cache.ttl_secs,
            "max_entries": state.config.cache.max_entries,
            "stale_retention_secs": state.config.cache.stale_retention_secs,
        },
        "sampling": &state.config.sampling,
        "endpoints": [
            "/api/weather/{layer}/{z}/{x}/{y}.png",
            "/api/weather/wind-vectors?bounds=west,south,east,north",
            "/api/weather/current?lat=&lon=",
            "/api/weather/forecast?lat=&lon=&days=",
            "/api/metrics",
            "/health",
            "/metrics",
        ],
    }))
}

/// GET /api/metrics - JSON summary of request, cache and render counters
#[instrument(skip(state))]
pub async fn api_metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.metrics.snapshot().await;
    let cache = state.pipeline.store().stats().await;

    Json(json!({
        "metrics": snapshot,
        "cache": cache,
        "cache_hit_rate": cache.hit_rate(),
        "renders_in_flight": state.pipeline.renders_in_flight(),
    }))
}

/// GET /metrics - Prometheus text exposition
#[instrument(skip(state))]
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.pipeline.store().stats().await;

    let mut output = String::new();
    output.push_str(&format!(
        "# HELP tile_cache_entries Tiles currently held by the store\n# TYPE tile_cache_entries gauge\ntile_cache_entries {}\n",
        cache.entries
    ));
    output.push_str(&format!(
        "# HELP tile_cache_evictions Tiles evicted at capacity\n# TYPE tile_cache_evictions counter\ntile_cache_evictions {}\n",
        cache.evictions
    ));
    output.push_str(&format!(
        "# HELP tile_cache_purged Tiles removed by the sweeper\n# TYPE tile_cache_purged counter\ntile_cache_purged {}\n",
        cache.purged
    ));
    output.push_str(&format!(
        "# HELP tile_renders_in_flight Renders currently running\n# TYPE tile_renders_in_flight gauge\ntile_renders_in_flight {}\n",
        state.pipeline.renders_in_flight()
    ));
    output.push_str(&format!(
        "# HELP tile_api_uptime_seconds Seconds since start\n# TYPE tile_api_uptime_seconds gauge\ntile_api_uptime_seconds {}\n",
        state.metrics.uptime().as_secs()
    ));

    if let Some(handle) = &state.prometheus {
        output.push_str(&handle.render());
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        output,
    )
}

//! HTTP surface tests driven through the router without a listener.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use renderer::color::temperature_color;
use renderer::RasterImage;
use storage::{TileMemoryCache, TileStore};
use test_utils::fixtures::forecast_payload;
use test_utils::{assert_close, ConstantSource, CountingSource, FailingSource, MockUpstream};
use tile_api::{build_router, AppState, TileServerConfig};
use weather_source::{
    SharedSampleSource, WeatherApiClient, WeatherApiConfig, WeatherSample,
};

fn router_with(source: SharedSampleSource) -> Router {
    let store: Arc<dyn TileStore> = Arc::new(TileMemoryCache::new(Duration::from_secs(3600)));
    let state = AppState::from_parts(TileServerConfig::default(), source, store);
    build_router(Arc::new(state))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn windy(wind_kph: f64, degree: f64) -> ConstantSource {
    let mut template = WeatherSample::neutral(0.0, 0.0);
    template.wind_kph = wind_kph;
    template.wind_degree = degree;
    ConstantSource::new(template)
}

#[tokio::test]
async fn test_health() {
    let app = router_with(Arc::new(ConstantSource::temperature(0.0)));
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_tile_png_and_cache_headers() {
    let source = Arc::new(CountingSource::new(ConstantSource::temperature(20.0)));
    let app = router_with(source.clone());

    let (status, headers, body) = get(&app, "/api/weather/temperature/5/16/10.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers["x-tile-cache"], "miss");

    let image = RasterImage::from_png(body).unwrap();
    assert_eq!((image.width(), image.height()), (256, 256));
    assert_eq!(image.pixel(37, 200), Some(temperature_color(20.0)));

    let (status, headers, _) = get(&app, "/api/weather/temperature/5/16/10.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-tile-cache"], "hit");
    assert_eq!(source.calls(), 16);
}

#[tokio::test]
async fn test_tile_errors() {
    let app = router_with(Arc::new(ConstantSource::temperature(0.0)));

    let (status, _, _) = get(&app, "/api/weather/radar/1/0/0.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_json(&app, "/api/weather/wind/5/40/10.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("5/40/10"));

    let (status, _, _) = get(&app, "/api/weather/wind/5/16/10.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = get(&app, "/api/weather/wind/five/16/10.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_render_is_transparent_tile() {
    let app = router_with(Arc::new(FailingSource));
    let (status, headers, body) = get(&app, "/api/weather/precipitation/3/1/1.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-tile-cache"], "miss");
    // Not cached server-side, so clients must not hold on to it either.
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert!(RasterImage::from_png(body).unwrap().is_fully_transparent());
}

#[tokio::test]
async fn test_wind_vectors_default_bounds() {
    let app = router_with(Arc::new(windy(36.0, 270.0)));
    let (status, body) = get_json(&app, "/api/weather/wind-vectors").await;
    assert_eq!(status, StatusCode::OK);

    let vectors = body["vectors"].as_array().unwrap();
    assert_eq!(vectors.len(), 15);
    assert_eq!(vectors[0]["lat"], 49.0);
    assert_eq!(vectors[0]["lon"], 14.0);
    assert_close!(vectors[0]["speed"].as_f64().unwrap(), 10.0, 1e-9);
    assert_eq!(vectors[0]["direction"], 270.0);
}

#[tokio::test]
async fn test_wind_vectors_bounds_validation() {
    let app = router_with(Arc::new(windy(10.0, 0.0)));

    let (status, body) = get_json(&app, "/api/weather/wind-vectors?bounds=0,0,4,4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vectors"].as_array().unwrap().len(), 4);

    let (status, _) = get_json(&app, "/api/weather/wind-vectors?bounds=1,2,3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/weather/wind-vectors?bounds=-180,-80,180,80").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wind_vectors_skip_failed_points() {
    let app = router_with(Arc::new(FailingSource));
    let (status, body) = get_json(&app, "/api/weather/wind-vectors").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["vectors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_current_conditions() {
    let app = router_with(Arc::new(ConstantSource::temperature(17.5)));

    let (status, body) = get_json(&app, "/api/weather/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lat"], 52.2297);
    assert_eq!(body["lon"], 21.0122);
    assert_eq!(body["temp_c"], 17.5);

    let (status, body) = get_json(&app, "/api/weather/current?lat=10&lon=-20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lat"], 10.0);

    let (status, _) = get_json(&app, "/api/weather/current?lat=north").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/weather/current?lat=95&lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_current_upstream_failure_is_bad_gateway() {
    let app = router_with(Arc::new(FailingSource));
    let (status, body) = get_json(&app, "/api/weather/current").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("upstream"));
}

#[tokio::test]
async fn test_forecast_endpoint() {
    let upstream = MockUpstream::start(StatusCode::OK, forecast_payload(5)).await;
    let client = WeatherApiClient::new(WeatherApiConfig {
        base_url: upstream.base_url().to_string(),
        api_key: "k".to_string(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let store: Arc<dyn TileStore> = Arc::new(TileMemoryCache::new(Duration::from_secs(3600)));
    let state = AppState::from_parts(
        TileServerConfig::default(),
        Arc::new(ConstantSource::temperature(0.0)),
        store,
    )
    .with_forecast(Arc::new(client));
    let app = build_router(Arc::new(state));

    let (status, body) = get_json(&app, "/api/weather/forecast?days=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lat"], 52.2297);
    assert_eq!(body["days"].as_array().unwrap().len(), 5);
    assert_eq!(body["days"][0]["date"], "2024-03-04");
    assert_eq!(body["days"][4]["day_name"], "Friday");
    assert!(upstream.last_query().unwrap().contains("days=5"));

    // Defaults to a week.
    let (status, _) = get_json(&app, "/api/weather/forecast").await;
    assert_eq!(status, StatusCode::OK);
    assert!(upstream.last_query().unwrap().contains("days=7"));

    for uri in [
        "/api/weather/forecast?days=0",
        "/api/weather/forecast?days=15",
        "/api/weather/forecast?days=week",
        "/api/weather/forecast?lat=91",
    ] {
        let (status, _) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
    assert_eq!(upstream.requests(), 2);
}

#[tokio::test]
async fn test_forecast_without_source_is_bad_gateway() {
    let app = router_with(Arc::new(ConstantSource::temperature(0.0)));
    let (status, body) = get_json(&app, "/api/weather/forecast").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("forecast"));
}

#[tokio::test]
async fn test_config_lists_layers() {
    let app = router_with(Arc::new(ConstantSource::temperature(0.0)));
    let (status, body) = get_json(&app, "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tile_size"], 256);
    assert_eq!(body["cache"]["ttl_secs"], 3600);

    let names: Vec<&str> = body["weather_layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["temperature", "wind", "precipitation", "pressure", "humidity", "clouds"]
    );
}

#[tokio::test]
async fn test_metrics_endpoints() {
    let app = router_with(Arc::new(ConstantSource::temperature(0.0)));
    get(&app, "/api/weather/clouds/2/1/1.png").await;

    let (status, headers, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("tile_cache_entries 1"));

    let (status, body) = get_json(&app, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["tile_requests"], 1);
    assert_eq!(body["metrics"]["renders_total"], 1);
    assert_eq!(body["cache"]["entries"], 1);
}

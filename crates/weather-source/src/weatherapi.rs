//! WeatherAPI.com client: current conditions and daily forecasts.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use tile_common::{TileError, TileResult};

use crate::forecast::{parse_forecast, ForecastDay, ForecastSource};
use crate::{WeatherSample, WeatherSampleSource};

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct WeatherApiConfig {
    /// Base URL up to and including the API version, e.g. `https://api.weatherapi.com/v1`
    pub base_url: String,
    /// API key sent as the `key` query parameter
    pub api_key: String,
    /// Upper bound on a single request, connect included
    pub timeout: Duration,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.weatherapi.com/v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Live [`WeatherSampleSource`] backed by `GET {base_url}/current.json`,
/// and [`ForecastSource`] backed by `GET {base_url}/forecast.json`.
pub struct WeatherApiClient {
    client: Client,
    config: WeatherApiConfig,
}

impl WeatherApiClient {
    pub fn new(config: WeatherApiConfig) -> TileResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                TileError::UpstreamUnavailable(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// GET an endpoint with the API key attached. Transport failures and
    /// non-2xx statuses are `UpstreamUnavailable`.
    async fn fetch(&self, endpoint: &str, query: &[(&str, &str)]) -> TileResult<Bytes> {
        let response = self
            .client
            .get(self.endpoint_url(endpoint))
            .query(&[("key", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                TileError::UpstreamUnavailable(reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, endpoint, "Weather API returned error status");
            return Err(TileError::UpstreamUnavailable(format!(
                "upstream returned {}",
                status
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| TileError::UpstreamUnavailable(e.to_string()))
    }
}

#[async_trait]
impl WeatherSampleSource for WeatherApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        let query = format!("{},{}", lat, lon);
        let body = self
            .fetch("current.json", &[("q", query.as_str()), ("aqi", "no")])
            .await?;

        let json = match serde_json::from_slice::<Value>(&body) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, lat, lon, "Unparsable weather payload, using neutral defaults");
                Value::Null
            }
        };

        Ok(WeatherSample::from_current_json(lat, lon, &json))
    }

    fn name(&self) -> &str {
        "weatherapi"
    }
}

#[async_trait]
impl ForecastSource for WeatherApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn forecast(&self, lat: f64, lon: f64, days: u8) -> TileResult<Vec<ForecastDay>> {
        let query = format!("{},{}", lat, lon);
        let days = days.to_string();
        let body = self
            .fetch(
                "forecast.json",
                &[
                    ("q", query.as_str()),
                    ("days", days.as_str()),
                    ("aqi", "no"),
                    ("alerts", "no"),
                ],
            )
            .await?;

        let json: Value = serde_json::from_slice(&body).map_err(|e| {
            TileError::UpstreamUnavailable(format!("unparsable forecast payload: {}", e))
        })?;
        parse_forecast(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let client = WeatherApiClient::new(WeatherApiConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint_url("current.json"),
            "http://localhost:9999/v1/current.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = WeatherApiClient::new(WeatherApiConfig {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            api_key: "test".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = client.sample(52.0, 21.0).await.unwrap_err();
        assert!(matches!(err, TileError::UpstreamUnavailable(_)));
    }
}

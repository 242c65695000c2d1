//! Application state and shared resources.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use renderer::TileRasterizer;
use storage::{DiskTileCache, TileMemoryCache, TileStore};
use weather_source::{
    CachingSampleSource, SharedForecastSource, SharedSampleSource, WeatherApiClient,
};

use crate::config::TileServerConfig;
use crate::metrics::MetricsCollector;
use crate::pipeline::TilePipeline;

/// Shared application state.
pub struct AppState {
    pub config: TileServerConfig,
    pub pipeline: TilePipeline,
    /// Point source used by the current-conditions and wind-vector endpoints
    pub source: SharedSampleSource,
    /// Daily forecasts; absent when the state was assembled without one
    pub forecast: Option<SharedForecastSource>,
    pub metrics: Arc<MetricsCollector>,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the live state: WeatherAPI.com client, optional point-sample
    /// cache, and the tile store selected by configuration.
    pub async fn new(config: TileServerConfig) -> Result<Self> {
        let client = Arc::new(
            WeatherApiClient::new(config.weather_api())
                .context("creating weather upstream client")?,
        );

        let source: SharedSampleSource = if config.sample_cache_ttl().is_zero() {
            client.clone()
        } else {
            Arc::new(CachingSampleSource::new(
                client.clone(),
                config.sample_cache_ttl(),
                config.sampling.cache_capacity,
            ))
        };

        let store = open_store(&config).await?;
        Ok(Self::from_parts(config, source, store).with_forecast(client))
    }

    /// Assemble state around an existing source and store.
    pub fn from_parts(
        config: TileServerConfig,
        source: SharedSampleSource,
        store: Arc<dyn TileStore>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let rasterizer = Arc::new(TileRasterizer::new(source.clone(), config.rasterizer()));
        let pipeline = TilePipeline::new(rasterizer, store, metrics.clone());

        Self {
            config,
            pipeline,
            source,
            forecast: None,
            metrics,
            prometheus: None,
        }
    }

    pub fn with_forecast(mut self, forecast: SharedForecastSource) -> Self {
        self.forecast = Some(forecast);
        self
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Disk store when a cache directory is configured, memory otherwise.
pub async fn open_store(config: &TileServerConfig) -> Result<Arc<dyn TileStore>> {
    let ttl = config.cache_ttl();
    let store: Arc<dyn TileStore> = match &config.cache.dir {
        Some(dir) => Arc::new(
            DiskTileCache::open(dir, ttl)
                .await
                .with_context(|| format!("opening tile cache at {}", dir.display()))?,
        ),
        None => match config.cache.max_entries {
            Some(max) => Arc::new(TileMemoryCache::with_max_entries(ttl, max)),
            None => Arc::new(TileMemoryCache::new(ttl)),
        },
    };

    info!(
        store = store.name(),
        ttl_secs = ttl.as_secs(),
        "Tile store initialized"
    );
    Ok(store)
}

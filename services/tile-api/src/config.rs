//! Service configuration.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, then environment variables (a `.env` file is
//! loaded into the environment by `main`).

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use renderer::RasterizerConfig;
use weather_source::WeatherApiConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "tile-api")]
#[command(about = "Weather slippy-map tile server")]
pub struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Optional YAML configuration file
    #[arg(short, long, env = "TILE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileServerConfig {
    pub upstream: UpstreamSettings,
    pub cache: CacheSettings,
    pub sampling: SamplingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Freshness window for rendered tiles
    pub ttl_secs: u64,
    /// Persist tiles as PNG files here instead of in memory
    pub dir: Option<PathBuf>,
    /// Cap on in-memory entries; unbounded when absent
    pub max_entries: Option<usize>,
    /// How long expired tiles are kept as a fallback for failed renders
    pub stale_retention_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Point-sample memoization; 0 disables it
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        let api = WeatherApiConfig::default();
        Self {
            base_url: api.base_url,
            api_key: api.api_key,
            timeout_secs: api.timeout.as_secs(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            dir: None,
            max_entries: None,
            stale_retention_secs: 24 * 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        let rasterizer = RasterizerConfig::default();
        Self {
            concurrency: rasterizer.max_concurrent_samples,
            timeout_secs: rasterizer.sample_timeout.as_secs(),
            cache_ttl_secs: 300,
            cache_capacity: 10_000,
        }
    }
}

impl TileServerConfig {
    /// Defaults, then the YAML file if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config = Self::from_yaml_str(&contents)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("WEATHERAPI_KEY") {
            self.upstream.api_key = key;
        }
        if let Some(url) = lookup("WEATHERAPI_BASE_URL") {
            self.upstream.base_url = url;
        }
        override_parsed(&lookup, "TILE_CACHE_TTL_SECS", &mut self.cache.ttl_secs)?;
        if let Some(dir) = lookup("TILE_CACHE_DIR") {
            self.cache.dir = (!dir.trim().is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(raw) = lookup("TILE_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = Some(parse_var("TILE_CACHE_MAX_ENTRIES", &raw)?);
        }
        override_parsed(&lookup, "STALE_RETENTION_SECS", &mut self.cache.stale_retention_secs)?;
        override_parsed(&lookup, "SAMPLE_TIMEOUT_SECS", &mut self.sampling.timeout_secs)?;
        override_parsed(&lookup, "SAMPLE_CONCURRENCY", &mut self.sampling.concurrency)?;
        override_parsed(&lookup, "SAMPLE_CACHE_TTL_SECS", &mut self.sampling.cache_ttl_secs)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be greater than zero");
        }
        if self.cache.stale_retention_secs < self.cache.ttl_secs {
            anyhow::bail!(
                "cache.stale_retention_secs ({}) must be at least cache.ttl_secs ({})",
                self.cache.stale_retention_secs,
                self.cache.ttl_secs
            );
        }
        if self.sampling.concurrency == 0 {
            anyhow::bail!("sampling.concurrency must be greater than zero");
        }
        if self.sampling.timeout_secs == 0 {
            anyhow::bail!("sampling.timeout_secs must be greater than zero");
        }
        if self.upstream.api_key.is_empty() {
            warn!("WEATHERAPI_KEY is not set; upstream requests will be rejected");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.cache.stale_retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs.max(1))
    }

    pub fn sample_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.sampling.cache_ttl_secs)
    }

    pub fn weather_api(&self) -> WeatherApiConfig {
        WeatherApiConfig {
            base_url: self.upstream.base_url.clone(),
            api_key: self.upstream.api_key.clone(),
            timeout: Duration::from_secs(self.upstream.timeout_secs),
        }
    }

    pub fn rasterizer(&self) -> RasterizerConfig {
        RasterizerConfig {
            max_concurrent_samples: self.sampling.concurrency,
            sample_timeout: Duration::from_secs(self.sampling.timeout_secs),
        }
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid value for {}: {:?} ({})", name, raw, e))
}

fn override_parsed<T, F>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *target = parse_var(name, &raw)?;
    }
    Ok(())
}

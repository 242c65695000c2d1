//! Application metrics collection and reporting.
//!
//! Every event goes to two places: the `metrics` facade (scraped from
//! `/metrics` through the Prometheus recorder) and a set of in-process
//! atomics that back the JSON summary on `/api/metrics`.

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use tile_common::LayerKind;

/// Metrics collector for the tile API.
#[derive(Debug)]
pub struct MetricsCollector {
    pub tile_requests: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub stale_served: AtomicU64,
    pub coalesced: AtomicU64,

    pub renders_total: AtomicU64,
    pub render_errors: AtomicU64,

    pub samples_ok: AtomicU64,
    pub samples_failed: AtomicU64,

    render_times: RwLock<TimingStats>,
    png_encode_times: RwLock<TimingStats>,
    layer_render_times: RwLock<BTreeMap<LayerKind, TimingStats>>,

    start_time: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }

    fn summary(&self) -> TimingSummary {
        TimingSummary {
            count: self.count,
            avg_ms: self.avg_ms(),
            min_ms: self.min_us as f64 / 1000.0,
            max_ms: self.max_us as f64 / 1000.0,
            last_ms: self.last_us as f64 / 1000.0,
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tile_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            renders_total: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            samples_ok: AtomicU64::new(0),
            samples_failed: AtomicU64::new(0),
            render_times: RwLock::new(TimingStats::default()),
            png_encode_times: RwLock::new(TimingStats::default()),
            layer_render_times: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record_tile_request(&self, layer: LayerKind) {
        self.tile_requests.fetch_add(1, Ordering::Relaxed);
        counter!("tile_requests_total", "layer" => layer.name()).increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("tile_cache_hits_total").increment(1);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("tile_cache_misses_total").increment(1);
    }

    pub fn record_stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
        counter!("tile_stale_served_total").increment(1);
    }

    /// A request that waited on another request's render.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
        counter!("tile_renders_coalesced_total").increment(1);
    }

    /// Record a finished render attempt.
    pub async fn record_render(&self, layer: LayerKind, elapsed: Duration, success: bool) {
        let duration_us = elapsed.as_micros() as u64;
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        counter!("tile_renders_total", "layer" => layer.name()).increment(1);
        if !success {
            self.render_errors.fetch_add(1, Ordering::Relaxed);
            counter!("tile_render_errors_total", "layer" => layer.name()).increment(1);
        }
        histogram!("tile_render_duration_ms", "layer" => layer.name())
            .record(duration_us as f64 / 1000.0);

        self.render_times.write().await.record(duration_us);
        if success {
            self.layer_render_times
                .write()
                .await
                .entry(layer)
                .or_default()
                .record(duration_us);
        }
    }

    pub fn record_samples(&self, ok: usize, failed: usize) {
        self.samples_ok.fetch_add(ok as u64, Ordering::Relaxed);
        self.samples_failed.fetch_add(failed as u64, Ordering::Relaxed);
        counter!("weather_samples_total", "outcome" => "ok").increment(ok as u64);
        counter!("weather_samples_total", "outcome" => "failed").increment(failed as u64);
    }

    pub async fn record_png_encode(&self, elapsed: Duration) {
        let duration_us = elapsed.as_micros() as u64;
        self.png_encode_times.write().await.record(duration_us);
        histogram!("png_encode_duration_ms").record(duration_us as f64 / 1000.0);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current metrics snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let render_times = *self.render_times.read().await;
        let png_encode_times = *self.png_encode_times.read().await;
        let layers = self
            .layer_render_times
            .read()
            .await
            .iter()
            .map(|(layer, stats)| (*layer, stats.summary()))
            .collect();

        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_total = cache_hits + cache_misses;
        let cache_hit_rate = if cache_total > 0 {
            (cache_hits as f64 / cache_total as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            tile_requests: self.tile_requests.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            cache_hit_rate,
            stale_served: self.stale_served.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            renders_total: self.renders_total.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            samples_ok: self.samples_ok.load(Ordering::Relaxed),
            samples_failed: self.samples_failed.load(Ordering::Relaxed),
            render: render_times.summary(),
            png_encode: png_encode_times.summary(),
            layers,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics for JSON serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,

    pub tile_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub stale_served: u64,
    pub coalesced: u64,

    pub renders_total: u64,
    pub render_errors: u64,
    pub samples_ok: u64,
    pub samples_failed: u64,

    pub render: TimingSummary,
    pub png_encode: TimingSummary,
    /// Successful render timings per layer
    pub layers: BTreeMap<LayerKind, TimingSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub last_ms: f64,
}

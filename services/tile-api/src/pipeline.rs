//! The tile request path: cache lookup, coalesced render, publish.
//!
//! ```text
//! render_tile(layer, z, x, y)
//!   ├─ fresh entry in store ──────────────────────────────► Hit
//!   └─ miss ─► coalescer (one render per address)
//!                ├─ published since our miss ────────────► Hit
//!                ├─ render ok, ≥1 sample ─► put ──────────► Rendered
//!                ├─ render ok, 0 samples ─┐
//!                └─ render error ─────────┴─► stale entry? ─► Stale
//!                                             otherwise ───► Rendered (transparent) / error
//! ```

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use renderer::{RasterImage, RenderStats, TileRasterizer};
use storage::{RenderCoalescer, TileStore};
use tile_common::{LayerKind, TileAddress, TileError, TileResult};

use crate::metrics::MetricsCollector;

/// Where a served tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh cache entry
    Hit,
    /// Rendered for this request (or a request it was coalesced with)
    Rendered,
    /// Expired cache entry served because the fresh render failed
    Stale,
}

impl CacheStatus {
    /// Value of the `X-Tile-Cache` response header.
    pub fn header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Rendered => "miss",
            CacheStatus::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileResponse {
    pub image: Arc<RasterImage>,
    pub status: CacheStatus,
    /// Fallback content: a stale entry, or the transparent tile from a
    /// render with no successful samples. The store was not updated.
    pub degraded: bool,
}

impl TileResponse {
    fn fresh(image: Arc<RasterImage>, status: CacheStatus) -> Self {
        Self {
            image,
            status,
            degraded: false,
        }
    }

    pub fn png(&self) -> TileResult<Bytes> {
        self.image.encode_png()
    }

    /// `Cache-Control` value. Degraded tiles must not outlive the next
    /// retry, so clients revalidate them.
    pub fn cache_control(&self, ttl_secs: u64) -> String {
        if self.degraded {
            "no-cache".to_string()
        } else {
            format!("public, max-age={}", ttl_secs)
        }
    }
}

/// Result of one render, shared by every request coalesced onto it.
#[derive(Debug, Clone)]
struct RenderOutcome {
    image: Arc<RasterImage>,
    stats: RenderStats,
    /// Another render published the tile between our miss and our turn
    /// as leader; nothing was sampled.
    from_cache: bool,
}

pub struct TilePipeline {
    rasterizer: Arc<TileRasterizer>,
    store: Arc<dyn TileStore>,
    coalescer: RenderCoalescer<TileAddress, RenderOutcome>,
    metrics: Arc<MetricsCollector>,
}

impl TilePipeline {
    pub fn new(
        rasterizer: Arc<TileRasterizer>,
        store: Arc<dyn TileStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            rasterizer,
            store,
            coalescer: RenderCoalescer::new(),
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn rasterizer(&self) -> &Arc<TileRasterizer> {
        &self.rasterizer
    }

    pub fn renders_in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Serve one tile, rendering it if no fresh copy is cached.
    #[instrument(skip(self))]
    pub async fn render_tile(
        &self,
        layer: LayerKind,
        z: u32,
        x: u32,
        y: u32,
    ) -> TileResult<TileResponse> {
        let address = TileAddress::new(layer, z, x, y)?;
        self.metrics.record_tile_request(layer);

        if let Some(image) = self.store.get(&address).await {
            self.metrics.record_cache_hit();
            debug!(tile = %address, "Tile cache hit");
            return Ok(TileResponse::fresh(image, CacheStatus::Hit));
        }
        self.metrics.record_cache_miss();

        let rasterizer = self.rasterizer.clone();
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let coalesced = self
            .coalescer
            .run(address, move || render_and_publish(rasterizer, store, metrics, address))
            .await;
        if coalesced.joined {
            self.metrics.record_coalesced();
        }

        match coalesced.result {
            Ok(outcome) if outcome.from_cache => {
                Ok(TileResponse::fresh(outcome.image, CacheStatus::Hit))
            }
            Ok(outcome) if outcome.stats.samples_ok > 0 => {
                Ok(TileResponse::fresh(outcome.image, CacheStatus::Rendered))
            }
            Ok(outcome) => match self.stale_fallback(&address, "no samples available").await {
                Some(response) => Ok(response),
                None => Ok(TileResponse {
                    image: outcome.image,
                    status: CacheStatus::Rendered,
                    degraded: true,
                }),
            },
            Err(e) if e.is_client_error() => Err(e),
            Err(e) => match self.stale_fallback(&address, &e.to_string()).await {
                Some(response) => Ok(response),
                None => Err(e),
            },
        }
    }

    async fn stale_fallback(&self, address: &TileAddress, reason: &str) -> Option<TileResponse> {
        let stale = self.store.get_stale(address).await?;
        self.metrics.record_stale_served();
        warn!(
            tile = %address,
            age_secs = stale.age.as_secs(),
            reason,
            "Serving stale tile after failed render"
        );
        Some(TileResponse {
            image: stale.image,
            status: CacheStatus::Stale,
            degraded: true,
        })
    }
}

/// Render, pre-encode and cache one tile. Runs detached from the request
/// that started it.
///
/// The caller's miss and its registration with the coalescer are not one
/// step, so a render for the same address may have published in between.
/// The store is checked again before any sampling.
async fn render_and_publish(
    rasterizer: Arc<TileRasterizer>,
    store: Arc<dyn TileStore>,
    metrics: Arc<MetricsCollector>,
    address: TileAddress,
) -> TileResult<RenderOutcome> {
    if let Some(image) = store.get(&address).await {
        debug!(tile = %address, "Tile published while waiting to render");
        return Ok(RenderOutcome {
            image,
            stats: RenderStats::default(),
            from_cache: true,
        });
    }

    let started = Instant::now();
    let rendered = rasterizer.render_with_stats(&address).await;

    let (image, stats) = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            metrics.record_render(address.layer, started.elapsed(), false).await;
            return Err(e);
        }
    };
    metrics.record_samples(stats.samples_ok, stats.samples_failed);

    let encode_started = Instant::now();
    if let Err(e) = image.encode_png() {
        metrics.record_render(address.layer, started.elapsed(), false).await;
        return Err(TileError::RenderFailure(format!("PNG encoding failed: {}", e)));
    }
    metrics.record_png_encode(encode_started.elapsed()).await;

    let success = stats.samples_ok > 0;
    metrics.record_render(address.layer, started.elapsed(), success).await;

    let image = Arc::new(image);
    if success {
        if let Err(e) = store.put(address, image.clone()).await {
            warn!(tile = %address, store = store.name(), error = %e, "Failed to cache rendered tile");
        }
    }

    Ok(RenderOutcome {
        image,
        stats,
        from_cache: false,
    })
}

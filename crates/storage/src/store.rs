//! The tile store abstraction shared by the memory and disk caches.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use renderer::RasterImage;
use tile_common::{TileAddress, TileResult};

/// An entry past its TTL, handed out only as a fallback.
#[derive(Debug, Clone)]
pub struct StaleTile {
    pub image: Arc<RasterImage>,
    /// Time since the entry was published
    pub age: Duration,
}

/// TTL-bounded storage of rendered tiles keyed by address.
///
/// `put` replaces atomically: a concurrent reader sees either the old image
/// or the new one, never a mix. Expired entries are not removed on read so
/// that [`TileStore::get_stale`] can still serve them; `purge_older_than`
/// bounds how long they linger.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Fresh entry only (`age < ttl`).
    async fn get(&self, address: &TileAddress) -> Option<Arc<RasterImage>>;

    /// Any retained entry regardless of age.
    async fn get_stale(&self, address: &TileAddress) -> Option<StaleTile>;

    async fn put(&self, address: TileAddress, image: Arc<RasterImage>) -> TileResult<()>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn clear(&self) -> TileResult<()>;

    /// Drop entries at least `max_age` old. Returns how many were removed.
    async fn purge_older_than(&self, max_age: Duration) -> usize;

    fn ttl(&self) -> Duration;

    async fn stats(&self) -> CacheStatsSnapshot;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Lock-free counters updated by store implementations.
#[derive(Debug, Default)]
pub struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale_reads: AtomicU64,
    pub puts: AtomicU64,
    pub evictions: AtomicU64,
    pub purged: AtomicU64,
    pub errors: AtomicU64,
}

impl CacheCounters {
    pub fn snapshot(&self, entries: u64) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            entries,
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.stale_reads,
            &self.puts,
            &self.evictions,
            &self.purged,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of a store's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale_reads: u64,
    pub puts: u64,
    pub evictions: u64,
    pub purged: u64,
    pub errors: u64,
    pub entries: u64,
}

impl CacheStatsSnapshot {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

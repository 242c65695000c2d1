//! In-memory TTL cache for rendered tiles.
//!
//! Reads take the shared lock and `peek`, so hits never contend with each
//! other and never reorder the LRU list. That makes the list order equal to
//! publish order, and the optional entry cap evicts the oldest-published
//! tile first.
//!
//! Expiry is lazy: an expired entry stays in place (still usable as a stale
//! fallback) until it is replaced, evicted, or purged by
//! [`TileStore::purge_older_than`].

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use renderer::RasterImage;
use tile_common::{TileAddress, TileResult};

use crate::store::{CacheCounters, CacheStatsSnapshot, StaleTile, TileStore};

/// One published tile. Never mutated; superseded by a new `Arc`.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: TileAddress,
    pub image: Arc<RasterImage>,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

pub struct TileMemoryCache {
    cache: RwLock<LruCache<TileAddress, Arc<CacheEntry>>>,
    ttl: Duration,
    max_entries: Option<usize>,
    counters: CacheCounters,
}

impl TileMemoryCache {
    /// Pure TTL cache with no entry limit.
    pub fn new(ttl: Duration) -> Self {
        Self::build(ttl, None)
    }

    /// TTL cache holding at most `max_entries` tiles.
    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self::build(ttl, NonZeroUsize::new(max_entries))
    }

    fn build(ttl: Duration, cap: Option<NonZeroUsize>) -> Self {
        let cache = match cap {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            cache: RwLock::new(cache),
            ttl,
            max_entries: cap.map(NonZeroUsize::get),
            counters: CacheCounters::default(),
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// The published entry for `address`, fresh or not.
    pub async fn entry(&self, address: &TileAddress) -> Option<Arc<CacheEntry>> {
        self.cache.read().await.peek(address).cloned()
    }
}

#[async_trait]
impl TileStore for TileMemoryCache {
    async fn get(&self, address: &TileAddress) -> Option<Arc<RasterImage>> {
        let entry = self.entry(address).await;
        match entry {
            Some(entry) if entry.age() < self.ttl => {
                CacheCounters::bump(&self.counters.hits);
                Some(entry.image.clone())
            }
            _ => {
                CacheCounters::bump(&self.counters.misses);
                None
            }
        }
    }

    async fn get_stale(&self, address: &TileAddress) -> Option<StaleTile> {
        let entry = self.entry(address).await?;
        CacheCounters::bump(&self.counters.stale_reads);
        Some(StaleTile {
            image: entry.image.clone(),
            age: entry.age(),
        })
    }

    async fn put(&self, address: TileAddress, image: Arc<RasterImage>) -> TileResult<()> {
        let entry = Arc::new(CacheEntry {
            key: address,
            image,
            created_at: Instant::now(),
        });

        // `push` returns the replaced value for the same key, or the evicted
        // LRU pair when at capacity.
        let displaced = self.cache.write().await.push(address, entry);

        CacheCounters::bump(&self.counters.puts);
        if let Some((evicted_key, _)) = displaced {
            if evicted_key != address {
                CacheCounters::bump(&self.counters.evictions);
                debug!(evicted = %evicted_key, "Evicted oldest tile at capacity");
            }
        }
        Ok(())
    }

    async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn clear(&self) -> TileResult<()> {
        self.cache.write().await.clear();
        self.counters.reset();
        Ok(())
    }

    async fn purge_older_than(&self, max_age: Duration) -> usize {
        let mut cache = self.cache.write().await;

        // Publish order: the LRU end holds the oldest entries.
        let mut removed = 0usize;
        while let Some((_, entry)) = cache.peek_lru() {
            if entry.age() < max_age {
                break;
            }
            cache.pop_lru();
            removed += 1;
        }
        drop(cache);

        if removed > 0 {
            self.counters
                .purged
                .fetch_add(removed as u64, Ordering::Relaxed);
            info!(
                removed,
                max_age_secs = max_age.as_secs(),
                "Purged old tiles from memory cache"
            );
        }
        removed
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn stats(&self) -> CacheStatsSnapshot {
        let entries = self.cache.read().await.len() as u64;
        self.counters.snapshot(entries)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

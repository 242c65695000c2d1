//! Short-lived memoization of point samples.
//!
//! Neighbouring tiles share their edge sample points, and the point/vector
//! endpoints hit the same coordinates repeatedly, so successful samples are
//! kept for a few minutes keyed by coordinates rounded to 4 decimals (~11 m).

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use tile_common::TileResult;

use crate::{WeatherSample, WeatherSampleSource};

type PointKey = (i64, i64);

fn point_key(lat: f64, lon: f64) -> PointKey {
    ((lat * 1e4).round() as i64, (lon * 1e4).round() as i64)
}

/// Wraps another source with a TTL-bounded LRU of successful samples.
pub struct CachingSampleSource<S> {
    inner: S,
    ttl: Duration,
    entries: Mutex<LruCache<PointKey, (Instant, WeatherSample)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: WeatherSampleSource> CachingSampleSource<S> {
    /// A `ttl` of zero disables caching entirely.
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    async fn lookup(&self, key: &PointKey) -> Option<WeatherSample> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((stored_at, sample)) if stored_at.elapsed() < self.ttl => Some(sample.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl<S: WeatherSampleSource> WeatherSampleSource for CachingSampleSource<S> {
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        if self.ttl.is_zero() {
            return self.inner.sample(lat, lon).await;
        }

        let key = point_key(lat, lon);
        if let Some(mut sample) = self.lookup(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            sample.lat = lat;
            sample.lon = lon;
            return Ok(sample);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Only successes are remembered; a failing point is retried next time.
        let sample = self.inner.sample(lat, lon).await?;
        self.entries
            .lock()
            .await
            .put(key, (Instant::now(), sample.clone()));
        Ok(sample)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tile_common::TileError;

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl WeatherSampleSource for Counting {
        async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TileError::UpstreamUnavailable("down".into()));
            }
            Ok(WeatherSample::neutral(lat, lon))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn counting(fail: bool) -> Counting {
        Counting {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn test_repeated_point_hits_cache() {
        let cached = CachingSampleSource::new(counting(false), Duration::from_secs(60), 16);

        cached.sample(52.2297, 21.0122).await.unwrap();
        cached.sample(52.22971, 21.01221).await.unwrap(); // same rounded key

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.hits(), 1);
        assert_eq!(cached.misses(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cached = CachingSampleSource::new(counting(true), Duration::from_secs(60), 16);

        assert!(cached.sample(1.0, 1.0).await.is_err());
        assert!(cached.sample(1.0, 1.0).await.is_err());
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cached = CachingSampleSource::new(counting(false), Duration::ZERO, 16);

        cached.sample(1.0, 1.0).await.unwrap();
        cached.sample(1.0, 1.0).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_refetch() {
        let cached = CachingSampleSource::new(counting(false), Duration::from_millis(20), 16);

        cached.sample(1.0, 1.0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cached.sample(1.0, 1.0).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }
}

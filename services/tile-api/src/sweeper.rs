//! Background purge of long-expired tiles.
//!
//! Expired tiles are kept so a failed render can fall back to them, which
//! means nothing else ever removes them. The sweeper drops anything older
//! than the stale retention window on a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use storage::TileStore;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Entries at least this old are removed
    pub retention: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            retention: Duration::from_secs(24 * 3600),
        }
    }
}

pub struct CacheSweeper {
    store: Arc<dyn TileStore>,
    config: SweeperConfig,
}

impl CacheSweeper {
    pub fn new(store: Arc<dyn TileStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// One purge pass. Returns how many tiles were removed.
    pub async fn run_once(&self) -> usize {
        let removed = self.store.purge_older_than(self.config.retention).await;
        let remaining = self.store.len().await;
        debug!(
            store = self.store.name(),
            removed,
            remaining,
            "Cache sweep complete"
        );
        removed
    }

    /// Sweep on the configured interval until the task is dropped.
    pub async fn run_forever(self) {
        info!(
            store = self.store.name(),
            interval_secs = self.config.interval.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "Starting cache sweeper"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing is old enough yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run_forever())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::RasterImage;
    use storage::TileMemoryCache;
    use tile_common::{LayerKind, TileAddress};

    #[tokio::test]
    async fn test_run_once_purges_only_old_entries() {
        let store: Arc<dyn TileStore> = Arc::new(TileMemoryCache::new(Duration::from_millis(10)));
        let old = TileAddress::new(LayerKind::Pressure, 2, 1, 1).unwrap();
        let young = TileAddress::new(LayerKind::Pressure, 2, 2, 1).unwrap();

        store.put(old, Arc::new(RasterImage::new())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        store.put(young, Arc::new(RasterImage::new())).await.unwrap();

        let sweeper = CacheSweeper::new(
            store.clone(),
            SweeperConfig {
                interval: Duration::from_secs(60),
                retention: Duration::from_millis(50),
            },
        );

        assert_eq!(sweeper.run_once().await, 1);
        assert!(store.get_stale(&old).await.is_none());
        assert!(store.get_stale(&young).await.is_some());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_on_interval() {
        let store: Arc<dyn TileStore> = Arc::new(TileMemoryCache::new(Duration::from_millis(1)));
        let addr = TileAddress::new(LayerKind::Clouds, 1, 0, 0).unwrap();
        store.put(addr, Arc::new(RasterImage::new())).await.unwrap();

        let handle = CacheSweeper::new(
            store.clone(),
            SweeperConfig {
                interval: Duration::from_millis(20),
                retention: Duration::from_millis(5),
            },
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(store.is_empty().await);
    }
}

//! On-disk tile cache: one PNG per tile, file mtime as publish time.
//!
//! Layout is flat: `{dir}/{layer}_{z}_{x}_{y}.png`. Writes land in a
//! temporary file in the same directory and are renamed over the target, so
//! a reader opens either the previous file or the complete new one.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use renderer::RasterImage;
use tile_common::{TileAddress, TileError, TileResult};

use crate::store::{CacheCounters, CacheStatsSnapshot, StaleTile, TileStore};

pub struct DiskTileCache {
    dir: PathBuf,
    ttl: Duration,
    counters: CacheCounters,
    tmp_seq: AtomicU64,
}

impl DiskTileCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> TileResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            TileError::Cache(format!("cannot create cache dir {}: {}", dir.display(), e))
        })?;
        info!(dir = %dir.display(), ttl_secs = ttl.as_secs(), "Disk tile cache ready");

        Ok(Self {
            dir,
            ttl,
            counters: CacheCounters::default(),
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, address: &TileAddress) -> PathBuf {
        self.dir.join(address.file_name())
    }

    /// Load the tile file and its age, if present and decodable.
    async fn load(&self, address: &TileAddress) -> Option<(RasterImage, Duration)> {
        let path = self.path_for(address);
        let modified = fs::metadata(&path).await.ok()?.modified().ok()?;
        let age = file_age(modified);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Tile file vanished during read");
                return None;
            }
        };

        match RasterImage::from_png(Bytes::from(bytes)) {
            Ok(image) => Some((image, age)),
            Err(e) => {
                CacheCounters::bump(&self.counters.errors);
                warn!(path = %path.display(), error = %e, "Unreadable cached tile, ignoring");
                None
            }
        }
    }

    /// Every tile file in the cache directory with its mtime.
    async fn tile_files(&self) -> TileResult<Vec<(PathBuf, SystemTime)>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if TileAddress::from_file_name(name).is_none() {
                continue;
            }
            if let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) {
                files.push((entry.path(), modified));
            }
        }
        Ok(files)
    }
}

fn file_age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}

#[async_trait]
impl TileStore for DiskTileCache {
    async fn get(&self, address: &TileAddress) -> Option<Arc<RasterImage>> {
        let path = self.path_for(address);
        let fresh = match fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => file_age(modified) < self.ttl,
            Err(_) => false,
        };
        if !fresh {
            CacheCounters::bump(&self.counters.misses);
            return None;
        }

        match self.load(address).await {
            Some((image, age)) if age < self.ttl => {
                CacheCounters::bump(&self.counters.hits);
                Some(Arc::new(image))
            }
            _ => {
                CacheCounters::bump(&self.counters.misses);
                None
            }
        }
    }

    async fn get_stale(&self, address: &TileAddress) -> Option<StaleTile> {
        let (image, age) = self.load(address).await?;
        CacheCounters::bump(&self.counters.stale_reads);
        Some(StaleTile {
            image: Arc::new(image),
            age,
        })
    }

    #[instrument(skip(self, image), fields(tile = %address))]
    async fn put(&self, address: TileAddress, image: Arc<RasterImage>) -> TileResult<()> {
        let png = image.encode_png()?;
        let target = self.path_for(&address);
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            address.file_name(),
            std::process::id(),
            self.tmp_seq.fetch_add(1, Ordering::Relaxed)
        ));

        let written = async {
            fs::write(&tmp, &png).await?;
            fs::rename(&tmp, &target).await
        }
        .await;

        if let Err(e) = written {
            CacheCounters::bump(&self.counters.errors);
            let _ = fs::remove_file(&tmp).await;
            return Err(TileError::Cache(format!(
                "failed to write {}: {}",
                target.display(),
                e
            )));
        }

        CacheCounters::bump(&self.counters.puts);
        debug!(bytes = png.len(), "Tile written to disk cache");
        Ok(())
    }

    async fn len(&self) -> usize {
        self.tile_files().await.map(|f| f.len()).unwrap_or(0)
    }

    async fn clear(&self) -> TileResult<()> {
        for (path, _) in self.tile_files().await? {
            fs::remove_file(&path).await?;
        }
        self.counters.reset();
        Ok(())
    }

    async fn purge_older_than(&self, max_age: Duration) -> usize {
        let files = match self.tile_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Cannot list disk cache for purge");
                return 0;
            }
        };

        let mut removed = 0usize;
        for (path, modified) in files {
            if file_age(modified) >= max_age && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            self.counters
                .purged
                .fetch_add(removed as u64, Ordering::Relaxed);
            info!(removed, max_age_secs = max_age.as_secs(), "Purged old tiles from disk cache");
        }
        removed
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn stats(&self) -> CacheStatsSnapshot {
        self.counters.snapshot(self.len().await as u64)
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}

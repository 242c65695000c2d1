//! Per-key render coalescing.
//!
//! The first caller for a key becomes the leader: its work is spawned onto
//! the runtime and a watch channel is registered for the key. Callers that
//! arrive while the work is running subscribe to that channel instead of
//! starting their own. Because the work runs in its own task, dropping any
//! caller (including the leader) does not cancel it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, error};

use tile_common::{TileError, TileResult};

type Slot<T> = watch::Receiver<Option<TileResult<T>>>;
type SlotMap<K, T> = Arc<Mutex<HashMap<K, Slot<T>>>>;

/// Result of [`RenderCoalescer::run`].
#[derive(Debug, Clone)]
pub struct Coalesced<T> {
    pub result: TileResult<T>,
    /// True when this call waited on work started by another caller.
    pub joined: bool,
}

pub struct RenderCoalescer<K, T> {
    inflight: SlotMap<K, T>,
}

/// Removes the key once the spawned work finishes or unwinds.
struct SlotGuard<K: Eq + Hash, T> {
    inflight: SlotMap<K, T>,
    key: K,
}

impl<K: Eq + Hash, T> Drop for SlotGuard<K, T> {
    fn drop(&mut self) {
        lock(&self.inflight).remove(&self.key);
    }
}

fn lock<K, T>(map: &SlotMap<K, T>) -> MutexGuard<'_, HashMap<K, Slot<T>>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K, T> RenderCoalescer<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Display + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of keys with work currently running.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Run `make()` for `key` unless the same key is already running, in
    /// which case wait for and share that result.
    ///
    /// `make` is only called by the leader.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Coalesced<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TileResult<T>> + Send + 'static,
    {
        let (mut rx, joined) = {
            let mut map = lock(&self.inflight);
            match map.get(&key) {
                Some(rx) => (rx.clone(), true),
                None => {
                    let (tx, rx) = watch::channel(None);
                    map.insert(key.clone(), rx.clone());

                    let guard = SlotGuard {
                        inflight: self.inflight.clone(),
                        key: key.clone(),
                    };
                    let work = make();
                    tokio::spawn(async move {
                        let result = work.await;
                        // Unregister before publishing so a caller arriving
                        // now starts fresh rather than reading a finished slot.
                        drop(guard);
                        let _ = tx.send(Some(result));
                    });
                    (rx, false)
                }
            }
        };

        if joined {
            debug!(key = %key, "Joined in-flight render");
        }

        let result = match rx.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or_else(|| Err(TileError::RenderFailure("render produced no result".into()))),
            Err(_) => {
                error!(key = %key, "Render task ended without a result");
                Err(TileError::RenderFailure("render task aborted".into()))
            }
        };

        Coalesced { result, joined }
    }
}

impl<K, T> Default for RenderCoalescer<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Display + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let coalescer = Arc::new(RenderCoalescer::<String, u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let coalescer = coalescer.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("k".to_string(), || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(7)
                    })
                    .await
            }));
        }

        let mut joined = 0;
        for h in handles {
            let out = h.await.unwrap();
            assert_eq!(out.result.unwrap(), 7);
            joined += out.joined as usize;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(joined, 9);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let coalescer = RenderCoalescer::<String, String>::new();
        let a = coalescer.run("a".into(), || async { Ok("A".to_string()) });
        let b = coalescer.run("b".into(), || async { Ok("B".to_string()) });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.result.unwrap(), "A");
        assert_eq!(b.result.unwrap(), "B");
        assert!(!a.joined && !b.joined);
    }

    #[tokio::test]
    async fn test_errors_are_shared() {
        let coalescer = RenderCoalescer::<String, u32>::new();
        let out = coalescer
            .run("k".into(), || async {
                Err::<u32, _>(TileError::RenderFailure("boom".into()))
            })
            .await;
        assert_eq!(out.result, Err(TileError::RenderFailure("boom".into())));
    }

    #[tokio::test]
    async fn test_aborted_caller_does_not_cancel_work() {
        let coalescer = Arc::new(RenderCoalescer::<String, u32>::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let c = coalescer.clone();
        let f = finished.clone();
        let caller = tokio::spawn(async move {
            c.run("k".into(), || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_work_reports_failure() {
        let coalescer = RenderCoalescer::<String, u32>::new();
        let out = coalescer
            .run("k".into(), || async {
                let explode = true;
                if explode {
                    panic!("render exploded");
                }
                Ok(0)
            })
            .await;
        assert!(matches!(out.result, Err(TileError::RenderFailure(_))));
        assert_eq!(coalescer.in_flight(), 0);
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::model::AggregationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

struct CachedSnapshot {
    snapshot: Arc<AggregationSnapshot>,
    stored_at: Instant,
}

/// Single-slot cache holding the latest live snapshot.
///
/// The lock only guards the slot. It is never held while a refresh runs, so
/// callers that miss at the same time each recompute, and the newest
/// snapshot ends up stored.
pub struct SnapshotCache {
    ttl: Duration,
    slot: RwLock<Option<CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached snapshot if it is still inside the TTL.
    pub async fn fresh(&self) -> Option<Arc<AggregationSnapshot>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|cached| cached.stored_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    /// The cached snapshot and its age, fresh or not.
    pub async fn peek(&self) -> Option<(Arc<AggregationSnapshot>, Duration)> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .map(|cached| (Arc::clone(&cached.snapshot), cached.stored_at.elapsed()))
    }

    /// Replace the cached snapshot unless the slot already holds a newer one.
    pub async fn store(&self, snapshot: Arc<AggregationSnapshot>) {
        let mut slot = self.slot.write().await;
        if let Some(current) = slot.as_ref() {
            if current.snapshot.created_at() > snapshot.created_at() {
                debug!("discarding snapshot older than the cached one");
                return;
            }
        }
        *slot = Some(CachedSnapshot {
            snapshot,
            stored_at: Instant::now(),
        });
    }

    /// Serve the cached snapshot while fresh, otherwise run `refresh` and
    /// cache its result. Fallback snapshots are returned but never cached.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> (Arc<AggregationSnapshot>, CacheStatus)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AggregationSnapshot>,
    {
        if let Some(snapshot) = self.fresh().await {
            debug!("snapshot cache hit");
            return (snapshot, CacheStatus::Hit);
        }

        debug!("snapshot cache miss, refreshing");
        let snapshot = Arc::new(refresh().await);
        if !snapshot.is_fallback() {
            self.store(Arc::clone(&snapshot)).await;
        }
        (snapshot, CacheStatus::Miss)
    }
}

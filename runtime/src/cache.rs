//! In-memory holder of the last-known stock level.
//!
//! # Validity
//!
//! The cache is valid when it holds a snapshot loaded after the most recent
//! [`invalidate`](StockCache::invalidate). Invalidation only bumps an atomic
//! counter, so it never waits behind a rebuild in flight; a rebuild records the
//! counter value it started from and is treated as stale if the counter moved
//! while it was reading. A successful write is therefore never followed by a
//! stale read.
//!
//! # Concurrency
//!
//! Validate-and-rebuild runs under one async mutex: with N simultaneous misses
//! the first reader loads from the store and the others wait, then find the
//! cache valid and return without touching the store.

use crate::metrics::CacheMetrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stockwatch_core::{ItemId, StockError, StockSnapshot, StockStore};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<StockSnapshot>,
    /// Invalidation counter value the snapshot was loaded under
    loaded_at: u64,
    /// Number of successful rebuilds so far
    revisions: u64,
}

/// Cached view of one item's stock level.
pub struct StockCache {
    store: Arc<dyn StockStore>,
    item: ItemId,
    invalidations: AtomicU64,
    state: Mutex<CacheState>,
}

impl StockCache {
    /// Create an empty (invalid) cache for `item`.
    #[must_use]
    pub fn new(store: Arc<dyn StockStore>, item: ItemId) -> Self {
        Self {
            store,
            item,
            invalidations: AtomicU64::new(0),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The item this cache tracks.
    #[must_use]
    pub const fn item(&self) -> ItemId {
        self.item
    }

    /// Return the cached snapshot, reloading it from the store if stale.
    ///
    /// On a store failure the last valid snapshot is returned instead (and the
    /// failure logged); the cache stays stale so the next call retries.
    ///
    /// # Errors
    ///
    /// Propagates the store error when no snapshot was ever loaded.
    pub async fn get_snapshot(&self) -> Result<StockSnapshot, StockError> {
        let mut state = self.state.lock().await;
        let epoch = self.invalidations.load(Ordering::Acquire);

        if let Some(snapshot) = state.snapshot {
            if state.loaded_at == epoch {
                return Ok(snapshot);
            }
        }

        match self.store.read_quantity(self.item).await {
            Ok(quantity) => {
                state.revisions += 1;
                let snapshot = StockSnapshot::new(quantity, state.revisions);
                state.snapshot = Some(snapshot);
                state.loaded_at = epoch;

                CacheMetrics::record_refresh();
                tracing::debug!(
                    item_id = %self.item,
                    quantity,
                    revision = snapshot.revision,
                    "Stock cache refreshed"
                );
                Ok(snapshot)
            }
            Err(error) => {
                if let Some(stale) = state.snapshot {
                    CacheMetrics::record_stale_served();
                    tracing::warn!(
                        item_id = %self.item,
                        error = %error,
                        quantity = stale.quantity,
                        "Stock store read failed, serving stale snapshot"
                    );
                    Ok(stale)
                } else {
                    tracing::warn!(
                        item_id = %self.item,
                        error = %error,
                        "Stock store read failed and nothing is cached"
                    );
                    Err(error)
                }
            }
        }
    }

    /// Mark the cache stale. No I/O.
    pub fn invalidate(&self) {
        let epoch = self.invalidations.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(item_id = %self.item, epoch, "Stock cache invalidated");
    }

    /// Whether the next [`get_snapshot`](Self::get_snapshot) would be served
    /// without a store read.
    pub async fn is_valid(&self) -> bool {
        let state = self.state.lock().await;
        state.snapshot.is_some() && state.loaded_at == self.invalidations.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for StockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockCache")
            .field("item", &self.item)
            .field("invalidations", &self.invalidations.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

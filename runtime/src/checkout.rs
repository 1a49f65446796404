//! Checkout coordination.
//!
//! A checkout first looks at the cached stock level. That check is advisory:
//! it only saves a transaction when the item is already known to be empty.
//! The decision itself is made by the store's transactional decrement, which
//! is the only thing that serializes concurrent checkouts.

use crate::cache::StockCache;
use crate::metrics::CheckoutMetrics;
use std::sync::Arc;
use stockwatch_core::{CheckoutOutcome, ItemId, StockError, StockStore};
use tokio::sync::Notify;

/// Runs checkouts against the store and keeps the cache honest.
pub struct CheckoutCoordinator {
    store: Arc<dyn StockStore>,
    cache: Arc<StockCache>,
    wake: Option<Arc<Notify>>,
}

impl CheckoutCoordinator {
    /// Create a coordinator writing to `store` and invalidating `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn StockStore>, cache: Arc<StockCache>) -> Self {
        Self {
            store,
            cache,
            wake: None,
        }
    }

    /// Notify `wake` after every successful decrement.
    ///
    /// Pair with [`Notifier::with_wake`](crate::Notifier::with_wake) to push
    /// the new level immediately instead of on the next tick.
    #[must_use]
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Take one unit of `item`.
    ///
    /// Calling this on an empty item returns [`CheckoutOutcome::OutOfStock`]
    /// and never writes.
    ///
    /// # Errors
    ///
    /// - [`StockError::NotFound`] if the item does not exist
    /// - [`StockError::StoreUnavailable`] if the store failed; nothing was committed
    #[tracing::instrument(skip(self), fields(item_id = %item))]
    pub async fn checkout(&self, item: ItemId) -> Result<CheckoutOutcome, StockError> {
        let result = self.run(item).await;
        CheckoutMetrics::record(&result);

        match &result {
            Ok(CheckoutOutcome::Decremented { remaining }) => {
                tracing::info!(remaining, "Checkout decremented stock");
            }
            Ok(CheckoutOutcome::OutOfStock) => tracing::info!("Checkout found item out of stock"),
            Err(error) => tracing::warn!(error = %error, "Checkout failed"),
        }
        result
    }

    async fn run(&self, item: ItemId) -> Result<CheckoutOutcome, StockError> {
        if self.precheck(item).await? == 0 {
            return Ok(CheckoutOutcome::OutOfStock);
        }

        match self.store.decrement_if_available(item).await?.into_result() {
            Ok(remaining) => {
                self.cache.invalidate();
                if let Some(wake) = &self.wake {
                    wake.notify_one();
                }
                Ok(CheckoutOutcome::Decremented { remaining })
            }
            // Another checkout took the last unit first.
            Err(StockError::Conflict) => Ok(CheckoutOutcome::OutOfStock),
            Err(error) => Err(error),
        }
    }

    /// Last known quantity, from the cache when it tracks `item`.
    async fn precheck(&self, item: ItemId) -> Result<u32, StockError> {
        if item == self.cache.item() {
            Ok(self.cache.get_snapshot().await?.quantity)
        } else {
            self.store.read_quantity(item).await
        }
    }
}

impl std::fmt::Debug for CheckoutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutCoordinator")
            .field("cache", &self.cache)
            .field("push_on_checkout", &self.wake.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use std::time::Duration;
    use stockwatch_testing::InMemoryStockStore;

    const ITEM: ItemId = ItemId::new(1);

    fn coordinator(store: &InMemoryStockStore) -> (CheckoutCoordinator, Arc<StockCache>) {
        let store: Arc<dyn StockStore> = Arc::new(store.clone());
        let cache = Arc::new(StockCache::new(Arc::clone(&store), ITEM));
        (CheckoutCoordinator::new(store, Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn decrement_invalidates_cache() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 3);
        let (coordinator, cache) = coordinator(&store);

        let outcome = coordinator.checkout(ITEM).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Decremented { remaining: 2 });
        assert!(!cache.is_valid().await);

        // The next read sees the write.
        assert_eq!(cache.get_snapshot().await.unwrap().quantity, 2);
        assert_eq!(store.record(ITEM).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn empty_item_is_out_of_stock_without_writes() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 0);
        let (coordinator, _cache) = coordinator(&store);
        let version = store.record(ITEM).unwrap().version;

        for _ in 0..5 {
            assert_eq!(
                coordinator.checkout(ITEM).await.unwrap(),
                CheckoutOutcome::OutOfStock
            );
        }

        assert_eq!(store.decrement_count(), 0, "Pre-check short-circuits");
        let record = store.record(ITEM).unwrap();
        assert_eq!(record.quantity, 0);
        assert_eq!(record.version, version);
    }

    #[tokio::test]
    async fn last_unit_then_out_of_stock() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 1);
        let (coordinator, _cache) = coordinator(&store);

        assert_eq!(
            coordinator.checkout(ITEM).await.unwrap(),
            CheckoutOutcome::Decremented { remaining: 0 }
        );
        assert_eq!(
            coordinator.checkout(ITEM).await.unwrap(),
            CheckoutOutcome::OutOfStock
        );
        assert_eq!(store.decrement_count(), 1);
    }

    #[tokio::test]
    async fn lost_race_maps_to_out_of_stock() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 1);
        let (coordinator, cache) = coordinator(&store);
        cache.get_snapshot().await.unwrap();

        // Someone else takes the last unit; the cache still says 1.
        store.decrement_if_available(ITEM).await.unwrap();

        assert_eq!(
            coordinator.checkout(ITEM).await.unwrap(),
            CheckoutOutcome::OutOfStock
        );
        assert_eq!(store.record(ITEM).unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 2);
        store.fail_writes(true);
        let (coordinator, cache) = coordinator(&store);

        let result = coordinator.checkout(ITEM).await;
        assert!(matches!(result, Err(StockError::StoreUnavailable(_))));
        assert_eq!(store.record(ITEM).unwrap().quantity, 2);
        assert!(cache.is_valid().await, "Failed checkout must not invalidate");
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 2);
        let (coordinator, _cache) = coordinator(&store);
        let missing = ItemId::new(42);

        assert_eq!(
            coordinator.checkout(missing).await,
            Err(StockError::NotFound(missing))
        );
    }

    #[tokio::test]
    async fn successful_checkout_notifies_wake() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 2);
        let (coordinator, _cache) = coordinator(&store);
        let wake = Arc::new(Notify::new());
        let coordinator = coordinator.with_wake(Arc::clone(&wake));

        coordinator.checkout(ITEM).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), wake.notified())
            .await
            .expect("wake notified");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkouts_never_oversell() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 10);
        store.set_latency(Some(Duration::from_millis(1)));
        let (coordinator, _cache) = coordinator(&store);
        let coordinator = Arc::new(coordinator);

        let attempts = (0..40).map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.checkout(ITEM).await })
        });

        let mut decremented = 0;
        for attempt in futures::future::join_all(attempts).await {
            if attempt.unwrap().unwrap().is_decremented() {
                decremented += 1;
            }
        }

        assert_eq!(decremented, 10);
        assert_eq!(store.record(ITEM).unwrap().quantity, 0);
    }
}

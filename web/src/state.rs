//! Application state shared by all handlers.

use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::{ItemId, StockStore};
use stockwatch_runtime::metrics::MetricsExporter;
use stockwatch_runtime::{CheckoutCoordinator, StockCache, SubscriptionHub};

/// Handles to the stock pipeline.
///
/// Cloned into every request; all fields are shared handles.
#[derive(Clone)]
pub struct AppState {
    /// Persistent store, for direct record reads and readiness
    pub store: Arc<dyn StockStore>,
    /// Cached stock level of the tracked item
    pub cache: Arc<StockCache>,
    /// Checkout entry point
    pub coordinator: Arc<CheckoutCoordinator>,
    /// Observer registry feeding the SSE stream
    pub hub: SubscriptionHub,
    /// Prometheus rendering for `/metrics`
    pub metrics: MetricsExporter,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
}

impl AppState {
    /// Assemble state around an existing pipeline.
    #[must_use]
    pub fn new(
        store: Arc<dyn StockStore>,
        cache: Arc<StockCache>,
        coordinator: Arc<CheckoutCoordinator>,
        hub: SubscriptionHub,
    ) -> Self {
        Self {
            store,
            cache,
            coordinator,
            hub,
            metrics: MetricsExporter::disabled(),
            keep_alive: Duration::from_secs(15),
        }
    }

    /// Build a fresh pipeline over `store` for `item`.
    #[must_use]
    pub fn for_store(store: Arc<dyn StockStore>, item: ItemId, hub: SubscriptionHub) -> Self {
        let cache = Arc::new(StockCache::new(Arc::clone(&store), item));
        let coordinator = Arc::new(CheckoutCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&cache),
        ));
        Self::new(store, cache, coordinator, hub)
    }

    /// Serve metrics from `exporter`.
    #[must_use]
    pub fn with_metrics(mut self, exporter: MetricsExporter) -> Self {
        self.metrics = exporter;
        self
    }

    /// Set the SSE keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The single tracked item.
    #[must_use]
    pub fn item(&self) -> ItemId {
        self.cache.item()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("item", &self.item())
            .field("hub", &self.hub)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}

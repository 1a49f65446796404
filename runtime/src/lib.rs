//! # Stockwatch Runtime
//!
//! The in-process half of the stock pipeline: everything between the store
//! and the observers' transports.
//!
//! ## Core Components
//!
//! - **[`StockCache`]**: last-known stock level, invalidated on writes, lazily
//!   refreshed on read, stale-but-available on store failure
//! - **[`CheckoutCoordinator`]**: advisory pre-check, transactional decrement,
//!   cache invalidation on success
//! - **[`Notifier`]**: periodic tick emitting a `time` event and a stock event
//! - **[`SubscriptionHub`]**: bounded per-observer channels and fan-out with
//!   eviction of unresponsive observers
//!
//! ## Data Flow
//!
//! ```text
//! CheckoutCoordinator ──> StockStore ──> StockCache::invalidate
//!                                              │
//!        observers <── SubscriptionHub <── Notifier (tick)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let cache = Arc::new(StockCache::new(store.clone(), item));
//! let hub = SubscriptionHub::new(HubConfig::default());
//! let coordinator = CheckoutCoordinator::new(store, Arc::clone(&cache));
//!
//! let notifier = Notifier::new(cache, hub.clone(), Arc::new(SystemClock), NotifierConfig::default())
//!     .spawn();
//!
//! let outcome = coordinator.checkout(item).await?;
//! ```

/// Last-known stock level with validity tracking
pub mod cache;

/// Checkout coordination
pub mod checkout;

/// Observer registry and fan-out
pub mod hub;

/// Prometheus metrics for observability
pub mod metrics;

/// Periodic change notification
pub mod notifier;

pub use cache::StockCache;
pub use checkout::CheckoutCoordinator;
pub use hub::{HubConfig, Subscription, SubscriptionHub};
pub use notifier::{Notifier, NotifierConfig, NotifierHandle};

//! # Stockwatch Core
//!
//! Domain types and abstractions for tracking the stock level of a single item.
//!
//! This crate has no I/O of its own. It defines:
//!
//! - **Identifiers and records**: [`ItemId`], [`StockRecord`], [`StockSnapshot`]
//! - **Events**: [`ChangeEvent`] and the message formats pushed to observers
//! - **Errors**: the [`StockError`] taxonomy shared by every layer
//! - **Store abstraction**: the [`StockStore`] trait implemented by the
//!   `PostgreSQL` store and the in-memory test store
//! - **Environment**: the [`Clock`](environment::Clock) used by the notifier
//!
//! ## Data Flow
//!
//! ```text
//! checkout ──> StockStore (transaction) ──> cache invalidated
//!                                               │
//!              observers <── hub <── notifier tick
//! ```
//!
//! ## Example
//!
//! ```
//! use stockwatch_core::{stock_message, ChangeEvent};
//!
//! assert_eq!(stock_message(0), "Product X is out of stock");
//! assert_eq!(ChangeEvent::stock(stock_message(5)).payload(), "In stock: 5");
//! ```

pub mod error;
pub mod event;
pub mod ids;
pub mod stock;
pub mod store;

pub use error::StockError;
pub use event::{stock_message, ChangeEvent, EventKind, OUT_OF_STOCK_MESSAGE};
pub use ids::{ItemId, SubscriberId};
pub use stock::{CheckoutOutcome, DecrementOutcome, StockRecord, StockSnapshot};
pub use store::{StockStore, StoreFuture};

/// Environment module - Dependency injection traits
///
/// External dependencies that make behaviour time-dependent are abstracted
/// behind traits so tests can pin them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use stockwatch_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

//! # Stockwatch Testing
//!
//! Testing utilities for the Stockwatch workspace.
//!
//! This crate provides:
//! - [`InMemoryStockStore`]: a `StockStore` with transactional semantics,
//!   call counters and failure injection
//! - [`FixedClock`]: deterministic time for the notifier
//!
//! ## Example
//!
//! ```
//! use stockwatch_core::{ItemId, StockStore};
//! use stockwatch_testing::InMemoryStockStore;
//!
//! # async fn example() -> Result<(), stockwatch_core::StockError> {
//! let store = InMemoryStockStore::with_item(ItemId::new(1), "Product X", 2);
//! assert!(store.decrement_if_available(ItemId::new(1)).await?.applied);
//! assert_eq!(store.read_quantity(ItemId::new(1)).await?, 1);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use stockwatch_core::environment::Clock;

mod stock_mocks;

pub use stock_mocks::InMemoryStockStore;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use stockwatch_testing::mocks::FixedClock;
    /// use stockwatch_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 12:34:56 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T12:34:56Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

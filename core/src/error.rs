//! Error taxonomy shared by the store, cache, coordinator and hub.

use crate::ids::{ItemId, SubscriberId};
use thiserror::Error;

/// Errors that can occur while reading, decrementing or streaming stock.
///
/// | variant | retryable | surfaced to |
/// |---|---|---|
/// | `NotFound` | no | caller |
/// | `Conflict` | no | mapped to an out-of-stock outcome |
/// | `StoreUnavailable` | yes | caller as a failure status |
/// | `SubscriberUnresponsive` | no | logged, triggers that subscriber's teardown |
/// | `InvalidRecord` | no | caller |
///
/// Nothing in this workspace retries automatically; retry is the client's call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// No item with this identifier exists in the store.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// The item was exhausted by concurrent checkouts before this one committed.
    ///
    /// Not a failure from the caller's point of view: the checkout coordinator
    /// maps it to `CheckoutOutcome::OutOfStock`.
    #[error("Stock exhausted by a concurrent checkout")]
    Conflict,

    /// The store could not be reached or the transaction failed.
    ///
    /// Any open transaction has been rolled back when this is returned.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A subscriber did not accept an event within the delivery bound.
    #[error("Subscriber {0} unresponsive")]
    SubscriberUnresponsive(SubscriberId),

    /// A stored row violates the data model (for example a negative quantity).
    #[error("Invalid stock record: {0}")]
    InvalidRecord(String),
}

impl StockError {
    /// Whether the caller may reasonably retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

//! Stock records, snapshots and operation outcomes.

use crate::error::StockError;
use crate::ids::ItemId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted state of the tracked item.
///
/// `version` is regenerated by the store on every successful decrement, so it
/// changes exactly when `quantity` changes. External consumers may use it for
/// optimistic-concurrency checks; nothing in this workspace compares it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Immutable identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Units left, never negative
    pub quantity: u32,
    /// Version token
    pub version: Uuid,
}

impl StockRecord {
    /// Whether at least one unit is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Cached, possibly stale, read-only view of the stock level.
///
/// `revision` increases by one each time the cache reloads from the store.
/// Two snapshots with the same revision carry the same data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StockSnapshot {
    /// Units left
    pub quantity: u32,
    /// `quantity > 0`
    pub in_stock: bool,
    /// Cache rebuild counter
    pub revision: u64,
}

impl StockSnapshot {
    /// Build a snapshot, deriving `in_stock` from the quantity.
    #[must_use]
    pub const fn new(quantity: u32, revision: u64) -> Self {
        Self {
            quantity,
            in_stock: quantity > 0,
            revision,
        }
    }
}

/// Result of one transactional decrement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecrementOutcome {
    /// Whether a unit was taken
    pub applied: bool,
    /// Quantity after the transaction
    pub quantity: u32,
}

impl DecrementOutcome {
    /// One unit was taken; `remaining` units are left.
    #[must_use]
    pub const fn applied(remaining: u32) -> Self {
        Self {
            applied: true,
            quantity: remaining,
        }
    }

    /// Nothing was left to take; the transaction was a no-op.
    #[must_use]
    pub const fn exhausted() -> Self {
        Self {
            applied: false,
            quantity: 0,
        }
    }

    /// View the outcome as a result: remaining units, or [`StockError::Conflict`].
    ///
    /// # Errors
    ///
    /// Returns [`StockError::Conflict`] when the decrement was not applied.
    pub const fn into_result(self) -> Result<u32, StockError> {
        if self.applied {
            Ok(self.quantity)
        } else {
            Err(StockError::Conflict)
        }
    }
}

/// Outcome of a checkout that reached a decision.
///
/// Store failures are not outcomes; they are returned as `Err(StockError)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// One unit was taken
    Decremented {
        /// Units left after this checkout
        remaining: u32,
    },
    /// Nothing left to take; stored quantity untouched
    OutOfStock,
}

impl CheckoutOutcome {
    /// Whether this checkout took a unit.
    #[must_use]
    pub const fn is_decremented(&self) -> bool {
        matches!(self, Self::Decremented { .. })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exhausted_outcome_is_a_conflict() {
        assert_eq!(
            DecrementOutcome::exhausted().into_result(),
            Err(StockError::Conflict)
        );
        assert_eq!(DecrementOutcome::applied(3).into_result(), Ok(3));
    }

    #[test]
    fn checkout_outcome_serialization() {
        let json = serde_json::to_string(&CheckoutOutcome::Decremented { remaining: 4 })
            .expect("serialize");
        assert_eq!(json, r#"{"status":"decremented","remaining":4}"#);

        let json = serde_json::to_string(&CheckoutOutcome::OutOfStock).expect("serialize");
        assert_eq!(json, r#"{"status":"out_of_stock"}"#);
    }

    proptest! {
        #[test]
        fn snapshot_in_stock_tracks_quantity(quantity in 0u32..10_000, revision in any::<u64>()) {
            let snapshot = StockSnapshot::new(quantity, revision);
            prop_assert_eq!(snapshot.in_stock, quantity > 0);
            prop_assert_eq!(snapshot.revision, revision);
        }
    }
}

//! Stock store abstraction.
//!
//! The store is the only mutation point of the stock level. Its decrement must be
//! atomic with respect to every concurrent caller, including callers in other
//! processes sharing the same database, so implementations rely on the
//! database's transaction isolation rather than on in-process locks.
//!
//! # Implementations
//!
//! - `PostgresStockStore` (in `stockwatch-postgres`): row lock + single transaction
//! - `InMemoryStockStore` (in `stockwatch-testing`): fast, deterministic tests with
//!   failure injection
//!
//! # Example
//!
//! ```no_run
//! use stockwatch_core::{ItemId, StockError, StockStore};
//!
//! async fn take_one<S: StockStore>(store: &S) -> Result<bool, StockError> {
//!     let item = ItemId::new(1);
//!     if store.read_quantity(item).await? == 0 {
//!         return Ok(false);
//!     }
//!     Ok(store.decrement_if_available(item).await?.applied)
//! }
//! ```

use crate::error::StockError;
use crate::ids::ItemId;
use crate::stock::{DecrementOutcome, StockRecord};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`StockStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StockError>> + Send + 'a>>;

/// Query/transaction interface to the persistent stock store.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the trait can be
/// shared as `Arc<dyn StockStore>` between the cache, the coordinator and the
/// HTTP layer.
pub trait StockStore: Send + Sync {
    /// Read the current quantity.
    ///
    /// # Errors
    ///
    /// - [`StockError::NotFound`] if the item does not exist
    /// - [`StockError::StoreUnavailable`] if the store cannot be reached
    fn read_quantity(&self, item: ItemId) -> StoreFuture<'_, u32>;

    /// Atomically take one unit if any is left.
    ///
    /// Reads the quantity, and either returns [`DecrementOutcome::exhausted`]
    /// without writing (quantity 0) or decrements by one and regenerates the
    /// version token, all inside one transaction. Under N concurrent callers
    /// exactly `min(N, quantity)` calls are applied.
    ///
    /// # Errors
    ///
    /// - [`StockError::NotFound`] if the item does not exist
    /// - [`StockError::StoreUnavailable`] on I/O failure; the transaction is
    ///   rolled back and no partial state is visible
    fn decrement_if_available(&self, item: ItemId) -> StoreFuture<'_, DecrementOutcome>;

    /// Read the full record, including name and version token.
    ///
    /// # Errors
    ///
    /// Same as [`StockStore::read_quantity`].
    fn read_record(&self, item: ItemId) -> StoreFuture<'_, StockRecord>;
}

//! In-memory stock store for fast, deterministic testing.
//!
//! The whole map sits behind one mutex, which gives every operation the same
//! all-or-nothing visibility a database transaction gives the real store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Poisoning only follows a panicking test

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stockwatch_core::{DecrementOutcome, ItemId, StockError, StockRecord, StockStore, StoreFuture};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Faults {
    reads: AtomicBool,
    writes: AtomicBool,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    decrements: AtomicUsize,
}

/// In-memory [`StockStore`].
///
/// Cloning shares the underlying data, so a test can keep a handle for
/// assertions while the code under test owns another.
///
/// # Failure injection
///
/// [`fail_reads`](Self::fail_reads) and [`fail_writes`](Self::fail_writes)
/// make the matching operations return [`StockError::StoreUnavailable`]
/// without touching the data, which is what a rolled-back transaction
/// looks like from the outside.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStockStore {
    records: Arc<Mutex<HashMap<ItemId, StockRecord>>>,
    faults: Arc<Faults>,
    counters: Arc<Counters>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryStockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one item.
    #[must_use]
    pub fn with_item(id: ItemId, name: &str, quantity: u32) -> Self {
        let store = Self::new();
        store.insert(id, name, quantity);
        store
    }

    /// Provision (or replace) an item.
    pub fn insert(&self, id: ItemId, name: &str, quantity: u32) {
        let record = StockRecord {
            id,
            name: name.to_string(),
            quantity,
            version: Uuid::new_v4(),
        };
        self.records.lock().unwrap().insert(id, record);
    }

    /// Current record, bypassing counters and fault injection.
    #[must_use]
    pub fn record(&self, id: ItemId) -> Option<StockRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    /// Make reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.faults.reads.store(fail, Ordering::SeqCst);
    }

    /// Make decrements fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every operation, to widen race windows in concurrency tests.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Number of `read_quantity` / `read_record` calls that reached the store.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// Number of `decrement_if_available` calls that reached the store.
    #[must_use]
    pub fn decrement_count(&self) -> usize {
        self.counters.decrements.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup(&self, item: ItemId) -> Result<StockRecord, StockError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(StockError::StoreUnavailable(
                "injected read failure".to_string(),
            ));
        }
        self.records
            .lock()
            .unwrap()
            .get(&item)
            .cloned()
            .ok_or(StockError::NotFound(item))
    }
}

impl StockStore for InMemoryStockStore {
    fn read_quantity(&self, item: ItemId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.lookup(item).map(|record| record.quantity)
        })
    }

    fn decrement_if_available(&self, item: ItemId) -> StoreFuture<'_, DecrementOutcome> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.counters.decrements.fetch_add(1, Ordering::SeqCst);
            if self.faults.writes.load(Ordering::SeqCst) {
                return Err(StockError::StoreUnavailable(
                    "injected write failure".to_string(),
                ));
            }

            let mut records = self.records.lock().unwrap();
            let record = records.get_mut(&item).ok_or(StockError::NotFound(item))?;
            if record.quantity == 0 {
                return Ok(DecrementOutcome::exhausted());
            }
            record.quantity -= 1;
            record.version = Uuid::new_v4();
            Ok(DecrementOutcome::applied(record.quantity))
        })
    }

    fn read_record(&self, item: ItemId) -> StoreFuture<'_, StockRecord> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.lookup(item)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: ItemId = ItemId::new(1);

    #[tokio::test]
    async fn decrement_stops_at_zero() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 1);

        let first = store.decrement_if_available(ITEM).await.unwrap();
        assert_eq!(first, DecrementOutcome::applied(0));

        let second = store.decrement_if_available(ITEM).await.unwrap();
        assert_eq!(second, DecrementOutcome::exhausted());
        assert_eq!(store.read_quantity(ITEM).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn version_changes_only_with_quantity() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 1);
        let before = store.record(ITEM).unwrap().version;

        store.decrement_if_available(ITEM).await.unwrap();
        let after = store.record(ITEM).unwrap().version;
        assert_ne!(before, after);

        store.decrement_if_available(ITEM).await.unwrap();
        assert_eq!(store.record(ITEM).unwrap().version, after);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let store = InMemoryStockStore::new();
        assert_eq!(
            store.read_quantity(ITEM).await,
            Err(StockError::NotFound(ITEM))
        );
        assert_eq!(
            store.decrement_if_available(ITEM).await,
            Err(StockError::NotFound(ITEM))
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_state() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 3);
        let version = store.record(ITEM).unwrap().version;
        store.fail_writes(true);

        let result = store.decrement_if_available(ITEM).await;
        assert!(matches!(result, Err(StockError::StoreUnavailable(_))));

        let record = store.record(ITEM).unwrap();
        assert_eq!(record.quantity, 3);
        assert_eq!(record.version, version);
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let store = InMemoryStockStore::with_item(ITEM, "Product X", 5);

        let attempts = (0..20).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.decrement_if_available(ITEM).await })
        });
        let results = futures::future::join_all(attempts).await;

        let applied = results
            .into_iter()
            .filter(|r| r.as_ref().unwrap().as_ref().unwrap().applied)
            .count();
        assert_eq!(applied, 5);
        assert_eq!(store.record(ITEM).unwrap().quantity, 0);
    }
}

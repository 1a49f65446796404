//! End-to-end tests of the checkout → cache → notifier → hub pipeline.
//!
//! Uses the in-memory store so the ordering and atomicity guarantees can be
//! checked without a database.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::{ChangeEvent, EventKind, ItemId, StockStore};
use stockwatch_runtime::{
    CheckoutCoordinator, HubConfig, Notifier, NotifierConfig, StockCache, Subscription,
    SubscriptionHub,
};
use stockwatch_testing::{test_clock, InMemoryStockStore};
use tokio::sync::Notify;

const ITEM: ItemId = ItemId::new(1);

struct Pipeline {
    store: InMemoryStockStore,
    coordinator: Arc<CheckoutCoordinator>,
    hub: SubscriptionHub,
    notifier: Notifier,
}

fn pipeline(quantity: u32) -> Pipeline {
    let store = InMemoryStockStore::with_item(ITEM, "Product X", quantity);
    let shared: Arc<dyn StockStore> = Arc::new(store.clone());
    let cache = Arc::new(StockCache::new(Arc::clone(&shared), ITEM));
    let hub = SubscriptionHub::new(HubConfig::default());
    let coordinator = Arc::new(CheckoutCoordinator::new(shared, Arc::clone(&cache)));
    let notifier = Notifier::new(
        cache,
        hub.clone(),
        Arc::new(test_clock()),
        NotifierConfig::default(),
    );
    Pipeline {
        store,
        coordinator,
        hub,
        notifier,
    }
}

async fn next_stock(subscription: &mut Subscription) -> ChangeEvent {
    loop {
        let event = subscription.recv().await.expect("subscription open");
        if event.kind() == EventKind::Stock {
            return event;
        }
    }
}

#[tokio::test]
async fn checkout_is_visible_on_the_next_tick() {
    let mut pipeline = pipeline(3);
    let mut subscription = pipeline.hub.subscribe();

    pipeline.notifier.tick().await;
    assert_eq!(next_stock(&mut subscription).await.payload(), "In stock: 3");

    pipeline.coordinator.checkout(ITEM).await.unwrap();
    pipeline.notifier.tick().await;
    assert_eq!(next_stock(&mut subscription).await.payload(), "In stock: 2");
}

#[tokio::test]
async fn every_subscriber_sees_the_same_sequence() {
    let mut pipeline = pipeline(2);
    let mut subscriptions: Vec<_> = (0..5).map(|_| pipeline.hub.subscribe()).collect();

    for _ in 0..3 {
        pipeline.notifier.tick().await;
        pipeline.coordinator.checkout(ITEM).await.unwrap();
    }

    for subscription in &mut subscriptions {
        let mut frames = Vec::new();
        for _ in 0..6 {
            let event = subscription.recv().await.unwrap();
            frames.push((event.kind(), event.payload().to_string()));
        }
        assert_eq!(
            frames,
            vec![
                (EventKind::Time, "12:34:56".to_string()),
                (EventKind::Stock, "In stock: 2".to_string()),
                (EventKind::Time, "12:34:56".to_string()),
                (EventKind::Stock, "In stock: 1".to_string()),
                (EventKind::Time, "12:34:56".to_string()),
                (EventKind::Stock, "Product X is out of stock".to_string()),
            ]
        );
    }
}

#[tokio::test]
async fn disconnected_subscriber_does_not_disturb_the_stream() {
    let mut pipeline = pipeline(5);
    let mut staying = pipeline.hub.subscribe();
    let leaving = pipeline.hub.subscribe();

    pipeline.notifier.tick().await;
    drop(leaving);
    pipeline.notifier.tick().await;

    assert_eq!(pipeline.hub.subscriber_count(), 1);
    for _ in 0..4 {
        assert!(staying.recv().await.is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn push_on_checkout_delivers_before_the_next_period() {
    let store = InMemoryStockStore::with_item(ITEM, "Product X", 4);
    let shared: Arc<dyn StockStore> = Arc::new(store.clone());
    let cache = Arc::new(StockCache::new(Arc::clone(&shared), ITEM));
    let hub = SubscriptionHub::new(HubConfig::default());
    let wake = Arc::new(Notify::new());
    let coordinator =
        CheckoutCoordinator::new(shared, Arc::clone(&cache)).with_wake(Arc::clone(&wake));
    let handle = Notifier::new(
        cache,
        hub.clone(),
        Arc::new(test_clock()),
        NotifierConfig {
            interval: Duration::from_secs(3600),
            ..NotifierConfig::default()
        },
    )
    .with_wake(wake)
    .spawn();

    let mut subscription = hub.subscribe();
    coordinator.checkout(ITEM).await.unwrap();

    let stock = tokio::time::timeout(Duration::from_secs(1), next_stock(&mut subscription))
        .await
        .expect("pushed before the hourly tick");
    assert_eq!(stock.payload(), "In stock: 3");

    handle.shutdown().await;
}

#[tokio::test]
async fn empty_item_checkouts_never_write() {
    let pipeline = pipeline(0);

    for _ in 0..10 {
        assert!(!pipeline.coordinator.checkout(ITEM).await.unwrap().is_decremented());
    }
    assert_eq!(pipeline.store.decrement_count(), 0);
    assert_eq!(pipeline.store.record(ITEM).unwrap().quantity, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// N concurrent checkouts against Q units: exactly min(N, Q) succeed.
    #[test]
    fn concurrent_checkouts_take_exactly_min_n_q(quantity in 0u32..20, attempts in 0usize..40) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (decremented, out_of_stock, remaining) = runtime.block_on(async {
            let pipeline = pipeline(quantity);
            let tasks = (0..attempts).map(|_| {
                let coordinator = Arc::clone(&pipeline.coordinator);
                tokio::spawn(async move { coordinator.checkout(ITEM).await })
            });

            let mut decremented = 0usize;
            let mut out_of_stock = 0usize;
            for task in futures::future::join_all(tasks).await {
                if task.unwrap().unwrap().is_decremented() {
                    decremented += 1;
                } else {
                    out_of_stock += 1;
                }
            }
            (decremented, out_of_stock, pipeline.store.record(ITEM).unwrap().quantity)
        });

        let expected = attempts.min(quantity as usize);
        prop_assert_eq!(decremented, expected);
        prop_assert_eq!(out_of_stock, attempts - expected);
        prop_assert_eq!(remaining as usize, quantity as usize - expected);
    }
}

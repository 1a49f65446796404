//! `/metrics` with a real Prometheus recorder installed.
//!
//! The recorder is process-global, so this file holds a single test and runs
//! as its own test binary.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum_test::TestServer;
use std::sync::Arc;
use stockwatch_core::ItemId;
use stockwatch_runtime::metrics::MetricsExporter;
use stockwatch_runtime::{HubConfig, Subscription, SubscriptionHub};
use stockwatch_testing::InMemoryStockStore;
use stockwatch_web::{router, AppState};

const ITEM: ItemId = ItemId::new(1);

fn sample(body: &str, name: &str) -> Option<f64> {
    body.lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' '))
        .and_then(|value| value.trim().parse().ok())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn metrics_endpoint_reports_checkouts_and_subscribers() {
    let exporter = MetricsExporter::install().unwrap();
    assert!(exporter.render().is_some(), "Recorder installed");

    let store = InMemoryStockStore::with_item(ITEM, "Product X", 3);
    let hub = SubscriptionHub::new(HubConfig::default());
    let state =
        AppState::for_store(Arc::new(store.clone()), ITEM, hub.clone()).with_metrics(exporter);
    let server = TestServer::new(router(state)).unwrap();

    server.post("/checkout").await.assert_status_ok();

    // Subscribers connect and disconnect from several threads at once; every
    // fourth one stays connected.
    let churn = (0..64).map(|i| {
        let hub = hub.clone();
        tokio::spawn(async move {
            let subscription = hub.subscribe();
            tokio::task::yield_now().await;
            (i % 4 == 0).then_some(subscription)
        })
    });
    let kept: Vec<Subscription> = futures::future::join_all(churn)
        .await
        .into_iter()
        .filter_map(|joined| joined.unwrap())
        .collect();
    assert_eq!(hub.subscriber_count(), kept.len());

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body = response.text();

    assert!(
        body.contains(r#"checkout_attempts_total{outcome="decremented"} 1"#),
        "missing checkout counter in:\n{body}"
    );
    assert_eq!(
        sample(&body, "hub_subscribers_active"),
        Some(16.0),
        "gauge must match the live subscriber count"
    );

    drop(kept);
    let body = server.get("/metrics").await.text();
    assert_eq!(sample(&body, "hub_subscribers_active"), Some(0.0));
}

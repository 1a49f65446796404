//! # Stockwatch Server
//!
//! Process bootstrap: wires the `PostgreSQL` store, the stock pipeline and the
//! HTTP surface together and runs them until a shutdown signal.
//!
//! ## Lifecycle
//!
//! ```text
//! connect pool ─> create schema ─> seed (optional) ─> spawn notifier ─> serve
//!                                                                         │
//!            stop notifier <─ close subscribers <─ Ctrl+C / SIGTERM ──────┘
//! ```

pub mod config;

pub use config::Config;

use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::environment::SystemClock;
use stockwatch_core::{ItemId, StockStore};
use stockwatch_postgres::{schema, PostgresStockStore};
use stockwatch_runtime::metrics::MetricsExporter;
use stockwatch_runtime::{CheckoutCoordinator, Notifier, StockCache, SubscriptionHub};
use stockwatch_web::{router, AppState};
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Run the server until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or prepared, the
/// metrics recorder cannot be installed, or the listener cannot bind.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let metrics = if config.server.metrics_enabled {
        MetricsExporter::install()?
    } else {
        MetricsExporter::disabled()
    };

    let store = PostgresStockStore::connect(&config.postgres.pool_config()).await?;
    schema::create_schema(store.pool()).await?;

    let item = match config.stock.seed_quantity {
        Some(quantity) => schema::seed_item(store.pool(), &config.stock.item_name, quantity).await?,
        None => config.item_id(),
    };
    log_tracked_item(&store, item).await;

    let store: Arc<dyn StockStore> = Arc::new(store);
    let hub = SubscriptionHub::new(config.stream.hub_config());
    let cache = Arc::new(StockCache::new(Arc::clone(&store), item));

    let mut coordinator = CheckoutCoordinator::new(Arc::clone(&store), Arc::clone(&cache));
    let mut notifier = Notifier::new(
        Arc::clone(&cache),
        hub.clone(),
        Arc::new(SystemClock),
        config.stream.notifier_config(),
    );
    if config.stream.push_on_checkout {
        let wake = Arc::new(Notify::new());
        coordinator = coordinator.with_wake(Arc::clone(&wake));
        notifier = notifier.with_wake(wake);
    }
    let notifier = notifier.spawn();

    let state = AppState::new(store, cache, Arc::new(coordinator), hub.clone())
        .with_metrics(metrics)
        .with_keep_alive(Duration::from_secs(config.server.sse_keepalive_secs.max(1)));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    // SSE responses never end on their own: closing every subscription lets
    // graceful shutdown drain them.
    let shutdown_hub = hub.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_hub.close_all();
        })
        .await?;

    info!("HTTP server stopped, stopping notifier");
    let timeout = Duration::from_secs(config.server.shutdown_timeout);
    if tokio::time::timeout(timeout, notifier.shutdown()).await.is_err() {
        warn!(timeout_secs = config.server.shutdown_timeout, "Notifier did not stop in time");
    }

    info!("Graceful shutdown complete");
    Ok(())
}

/// Report the tracked item at startup; a missing item is not fatal.
async fn log_tracked_item(store: &PostgresStockStore, item: ItemId) {
    match store.read_record(item).await {
        Ok(record) => info!(
            item_id = %record.id,
            name = %record.name,
            quantity = record.quantity,
            "Tracking stock item"
        ),
        Err(error) => warn!(item_id = %item, error = %error, "Tracked item is not readable yet"),
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}

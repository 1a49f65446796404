//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the pipeline components:
//! - Checkout outcomes
//! - Stock cache refreshes and stale reads
//! - Notifier ticks
//! - Subscription hub size and evictions
//!
//! # Example
//!
//! ```rust,no_run
//! use stockwatch_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = MetricsExporter::install()?;
//!
//! // Serve this from a `/metrics` route
//! let body = exporter.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use stockwatch_core::{CheckoutOutcome, StockError};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
///
/// Rendering is left to the HTTP layer, which exposes it on its own router
/// instead of binding a second listener.
#[derive(Clone, Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// An exporter that renders nothing (metrics disabled).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a warning
    /// and returns a disabled exporter.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self::disabled())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if no recorder was installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "checkout_attempts_total",
        "Checkout attempts by outcome (decremented, out_of_stock, not_found, unavailable, invalid)"
    );
    describe_counter!(
        "store_decrements_total",
        "Decrement transactions by result (applied, exhausted)"
    );
    describe_histogram!(
        "store_decrement_duration_seconds",
        "Time taken by a committed decrement transaction"
    );

    describe_counter!("cache_refresh_total", "Stock cache rebuilds from the store");
    describe_counter!(
        "cache_stale_served_total",
        "Reads answered with a stale snapshot after a store failure"
    );

    describe_counter!("notifier_ticks_total", "Notifier ticks");
    describe_counter!(
        "notifier_stock_skipped_total",
        "Ticks whose stock event was skipped because the stock read failed"
    );

    describe_gauge!("hub_subscribers_active", "Currently connected subscribers");
    describe_counter!(
        "hub_evictions_total",
        "Subscribers torn down because they did not accept an event in time"
    );
}

/// Checkout metrics recorder.
pub struct CheckoutMetrics;

impl CheckoutMetrics {
    /// Record the result of one checkout.
    pub fn record(result: &Result<CheckoutOutcome, StockError>) {
        let outcome = match result {
            Ok(CheckoutOutcome::Decremented { .. }) => "decremented",
            Ok(CheckoutOutcome::OutOfStock) | Err(StockError::Conflict) => "out_of_stock",
            Err(StockError::NotFound(_)) => "not_found",
            Err(StockError::StoreUnavailable(_) | StockError::SubscriberUnresponsive(_)) => {
                "unavailable"
            }
            Err(StockError::InvalidRecord(_)) => "invalid",
        };
        counter!("checkout_attempts_total", "outcome" => outcome).increment(1);
    }
}

/// Stock cache metrics recorder.
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a rebuild from the store.
    pub fn record_refresh() {
        counter!("cache_refresh_total").increment(1);
    }

    /// Record a stale snapshot served after a store failure.
    pub fn record_stale_served() {
        counter!("cache_stale_served_total").increment(1);
    }
}

/// Notifier metrics recorder.
pub struct NotifierMetrics;

impl NotifierMetrics {
    /// Record one tick.
    pub fn record_tick(stock_emitted: bool) {
        counter!("notifier_ticks_total").increment(1);
        if !stock_emitted {
            counter!("notifier_stock_skipped_total").increment(1);
        }
    }
}

/// Subscription hub metrics recorder.
pub struct HubMetrics;

impl HubMetrics {
    /// Record the current number of subscribers.
    #[allow(clippy::cast_precision_loss)] // Subscriber counts stay far below 2^52
    pub fn set_active(count: usize) {
        gauge!("hub_subscribers_active").set(count as f64);
    }

    /// Record an eviction of an unresponsive subscriber.
    pub fn record_eviction() {
        counter!("hub_evictions_total").increment(1);
    }
}

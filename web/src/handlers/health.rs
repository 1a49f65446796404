//! Health check endpoints.
//!
//! Used by load balancers and monitoring systems to verify service health.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check the store.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Whether the tracked item could be read from the store
    pub store: bool,
    /// Connected SSE observers
    pub subscribers: usize,
}

/// Readiness check endpoint.
///
/// Reads the tracked item straight from the store, bypassing the cache.
///
/// # Status Codes
///
/// - 200 OK: store reachable and item present
/// - 503 Service Unavailable: otherwise
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store = match state.store.read_quantity(state.item()).await {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            false
        }
    };

    let status = if store {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: store,
            store,
            subscribers: state.hub.subscriber_count(),
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockwatch_core::ItemId;
    use stockwatch_runtime::{HubConfig, SubscriptionHub};
    use stockwatch_testing::InMemoryStockStore;

    fn state(store: &InMemoryStockStore) -> AppState {
        AppState::for_store(
            Arc::new(store.clone()),
            ItemId::new(1),
            SubscriptionHub::new(HubConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_ready_when_store_reachable() {
        let store = InMemoryStockStore::with_item(ItemId::new(1), "Product X", 1);
        let (status, Json(body)) = readiness_check(State(state(&store))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.ready);
        assert_eq!(body.subscribers, 0);
    }

    #[tokio::test]
    async fn test_not_ready_when_store_fails() {
        let store = InMemoryStockStore::with_item(ItemId::new(1), "Product X", 1);
        store.fail_reads(true);
        let (status, Json(body)) = readiness_check(State(state(&store))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.store);
    }
}

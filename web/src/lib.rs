//! Axum HTTP surface for Stockwatch.
//!
//! # Request Flow
//!
//! ```text
//! GET  /sse        ──> SubscriptionHub::subscribe ──> text/event-stream
//! POST /checkout   ──> CheckoutCoordinator::checkout ──> JSON outcome
//! GET  /api/stock  ──> StockStore::read_record ──> JSON record
//! GET  /health, /ready, /metrics
//! ```
//!
//! Handlers only translate between HTTP and the runtime; every decision lives
//! in `stockwatch-runtime`. Domain errors become responses through
//! [`AppError`].
//!
//! # Example
//!
//! ```ignore
//! use stockwatch_web::{router, AppState};
//!
//! let state = AppState::for_store(store, item, hub);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6835").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export key types for convenience
pub use error::AppError;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the complete router.
///
/// All routes allow any origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sse", get(handlers::stream_events))
        .route("/checkout", post(handlers::checkout))
        .route("/api/stock", get(handlers::current_stock))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::render_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

//! Prometheus scrape endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

/// Render all metrics in Prometheus text format.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// 404 `METRICS_DISABLED` when no recorder is installed.
#[allow(clippy::unused_async)]
pub async fn render_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render().ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "Metrics are disabled".to_string(),
            "METRICS_DISABLED",
        )
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

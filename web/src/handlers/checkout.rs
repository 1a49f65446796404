//! Checkout endpoint.

use crate::{AppError, WebResult};
use crate::state::AppState;
use axum::{extract::State, Json};
use stockwatch_core::{CheckoutOutcome, OUT_OF_STOCK_MESSAGE};

/// Take one unit of the tracked item.
///
/// # Endpoint
///
/// ```text
/// POST /checkout
/// ```
///
/// # Response
///
/// ```json
/// { "status": "decremented", "remaining": 4 }
/// ```
///
/// # Errors
///
/// - 409 `OUT_OF_STOCK` when nothing is left
/// - 404 `NOT_FOUND` when the item does not exist
/// - 503 `SERVICE_UNAVAILABLE` when the store failed (nothing was committed)
pub async fn checkout(State(state): State<AppState>) -> WebResult<Json<CheckoutOutcome>> {
    match state.coordinator.checkout(state.item()).await? {
        outcome @ CheckoutOutcome::Decremented { .. } => Ok(Json(outcome)),
        CheckoutOutcome::OutOfStock => Err(AppError::out_of_stock(OUT_OF_STOCK_MESSAGE)),
    }
}

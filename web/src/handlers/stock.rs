//! Current stock record.

use crate::WebResult;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use stockwatch_core::{ItemId, StockRecord};
use uuid::Uuid;

/// Stock record as returned to clients.
#[derive(Debug, Serialize)]
pub struct StockResponse {
    /// Item identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Units left
    pub quantity: u32,
    /// `quantity > 0`
    pub in_stock: bool,
    /// Version token, changes with every decrement
    pub version: Uuid,
}

impl From<StockRecord> for StockResponse {
    fn from(record: StockRecord) -> Self {
        Self {
            in_stock: record.in_stock(),
            id: record.id,
            name: record.name,
            quantity: record.quantity,
            version: record.version,
        }
    }
}

/// Read the tracked item from the store.
///
/// # Endpoint
///
/// ```text
/// GET /api/stock
/// ```
///
/// # Errors
///
/// 404 if the item is missing, 503 if the store is down.
pub async fn current_stock(State(state): State<AppState>) -> WebResult<Json<StockResponse>> {
    let record = state.store.read_record(state.item()).await?;
    Ok(Json(record.into()))
}

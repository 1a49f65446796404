//! Schema creation and item provisioning.
//!
//! Layout:
//!
//! ```text
//! products
//! ├── id              SERIAL PRIMARY KEY
//! ├── name            TEXT NOT NULL UNIQUE
//! ├── stock_quantity  INTEGER NOT NULL CHECK (stock_quantity >= 0)
//! └── version         UUID NOT NULL DEFAULT gen_random_uuid()
//! ```

use sqlx::PgPool;
use stockwatch_core::{ItemId, StockError};

/// Create the `products` table if it does not exist.
///
/// # Errors
///
/// Returns [`StockError::StoreUnavailable`] if the DDL fails.
pub async fn create_schema(pool: &PgPool) -> Result<(), StockError> {
    // gen_random_uuid() is built in from PostgreSQL 13; older servers need pgcrypto.
    sqlx::query("CREATE EXTENSION IF NOT EXISTS pgcrypto")
        .execute(pool)
        .await
        .map_err(|e| StockError::StoreUnavailable(format!("Failed to enable pgcrypto: {e}")))?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS products (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            stock_quantity INTEGER NOT NULL CHECK (stock_quantity >= 0),
            version UUID NOT NULL DEFAULT gen_random_uuid()
        )
        ",
    )
    .execute(pool)
    .await
    .map_err(|e| StockError::StoreUnavailable(format!("Failed to create products table: {e}")))?;

    tracing::debug!("Products schema ready");
    Ok(())
}

/// Provision an item with an initial quantity, keeping it untouched if it exists.
///
/// Returns the identifier of the (new or existing) item.
///
/// # Errors
///
/// - [`StockError::InvalidRecord`] if `quantity` does not fit the column
/// - [`StockError::StoreUnavailable`] if a statement fails
pub async fn seed_item(pool: &PgPool, name: &str, quantity: u32) -> Result<ItemId, StockError> {
    let quantity = i32::try_from(quantity).map_err(|_| {
        StockError::InvalidRecord(format!("Initial quantity {quantity} exceeds i32::MAX"))
    })?;

    let inserted = sqlx::query(
        "INSERT INTO products (name, stock_quantity) VALUES ($1, $2)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(name)
    .bind(quantity)
    .execute(pool)
    .await
    .map_err(|e| StockError::StoreUnavailable(format!("Failed to seed item: {e}")))?
    .rows_affected();

    let (id,): (i32,) = sqlx::query_as("SELECT id FROM products WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| StockError::StoreUnavailable(format!("Failed to look up seeded item: {e}")))?;

    if inserted == 0 {
        tracing::info!(item_id = id, name, "Item already provisioned, seed skipped");
    } else {
        tracing::info!(item_id = id, name, quantity, "Item provisioned");
    }

    Ok(ItemId::new(id))
}

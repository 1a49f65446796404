//! `PostgreSQL` implementation of [`StockStore`].

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::{Duration, Instant};
use stockwatch_core::{DecrementOutcome, ItemId, StockError, StockRecord, StockStore, StoreFuture};
use uuid::Uuid;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// How long a caller may wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Session `statement_timeout`; bounds every query and lock wait
    pub statement_timeout: Duration,
}

impl PoolConfig {
    /// Settings with defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(5),
        }
    }
}

/// Stock store backed by a `products` table.
///
/// Decrements take an exclusive row lock for the duration of one transaction,
/// so concurrent checkouts (from this process or any other sharing the
/// database) are serialized by `PostgreSQL` itself.
#[derive(Clone, Debug)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::StoreUnavailable`] if the URL is invalid or the
    /// database cannot be reached.
    pub async fn connect(config: &PoolConfig) -> Result<Self, StockError> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| StockError::StoreUnavailable(format!("Invalid database URL: {e}")))?
            .options([(
                "statement_timeout",
                config.statement_timeout.as_millis().to_string(),
            )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| StockError::StoreUnavailable(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            statement_timeout_ms = config.statement_timeout.as_millis(),
            "Connected to stock database"
        );

        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[tracing::instrument(skip(self), fields(item_id = %item))]
    async fn decrement(&self, item: ItemId) -> Result<DecrementOutcome, StockError> {
        let started = Instant::now();

        // Dropping `tx` on an early return rolls the transaction back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| unavailable("begin transaction", &e))?;

        let locked: Option<(i32,)> =
            sqlx::query_as("SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE")
                .bind(item.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| unavailable("lock item", &e))?;

        let Some((current,)) = locked else {
            return Err(StockError::NotFound(item));
        };

        if current <= 0 {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "Rollback of empty decrement failed");
            }
            metrics::counter!("store_decrements_total", "result" => "exhausted").increment(1);
            tracing::debug!("Item exhausted, nothing to decrement");
            return Ok(DecrementOutcome::exhausted());
        }

        let (remaining,): (i32,) = sqlx::query_as(
            r"
            UPDATE products
            SET stock_quantity = stock_quantity - 1,
                version = gen_random_uuid()
            WHERE id = $1
            RETURNING stock_quantity
            ",
        )
        .bind(item.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unavailable("decrement", &e))?;

        tx.commit().await.map_err(|e| unavailable("commit", &e))?;

        metrics::counter!("store_decrements_total", "result" => "applied").increment(1);
        metrics::histogram!("store_decrement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(remaining, "Decrement committed");

        Ok(DecrementOutcome::applied(to_quantity(remaining)?))
    }

    async fn quantity(&self, item: ItemId) -> Result<u32, StockError> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(item.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("read quantity", &e))?;

        let (quantity,) = row.ok_or(StockError::NotFound(item))?;
        to_quantity(quantity)
    }

    async fn record(&self, item: ItemId) -> Result<StockRecord, StockError> {
        let row: Option<(i32, String, i32, Uuid)> = sqlx::query_as(
            "SELECT id, name, stock_quantity, version FROM products WHERE id = $1",
        )
        .bind(item.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("read record", &e))?;

        let (id, name, quantity, version) = row.ok_or(StockError::NotFound(item))?;
        Ok(StockRecord {
            id: ItemId::new(id),
            name,
            quantity: to_quantity(quantity)?,
            version,
        })
    }
}

impl StockStore for PostgresStockStore {
    fn read_quantity(&self, item: ItemId) -> StoreFuture<'_, u32> {
        Box::pin(self.quantity(item))
    }

    fn decrement_if_available(&self, item: ItemId) -> StoreFuture<'_, DecrementOutcome> {
        Box::pin(self.decrement(item))
    }

    fn read_record(&self, item: ItemId) -> StoreFuture<'_, StockRecord> {
        Box::pin(self.record(item))
    }
}

fn unavailable(operation: &str, error: &sqlx::Error) -> StockError {
    tracing::warn!(operation, error = %error, "Stock store operation failed");
    StockError::StoreUnavailable(format!("Failed to {operation}: {error}"))
}

fn to_quantity(raw: i32) -> Result<u32, StockError> {
    u32::try_from(raw).map_err(|_| StockError::InvalidRecord(format!("Negative quantity {raw}")))
}

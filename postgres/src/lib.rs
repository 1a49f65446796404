//! `PostgreSQL` stock store for Stockwatch.
//!
//! This crate provides the production implementation of the `StockStore` trait
//! from `stockwatch-core`. It uses sqlx and supports:
//!
//! - Row-locked, single-transaction decrements (`SELECT … FOR UPDATE`)
//! - Server-side version token regeneration (`gen_random_uuid()`)
//! - Connection pooling with bounded acquire and statement timeouts
//! - Idempotent schema creation and item provisioning
//!
//! # Example
//!
//! ```no_run
//! use stockwatch_core::{ItemId, StockStore};
//! use stockwatch_postgres::{PoolConfig, PostgresStockStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStockStore::connect(&PoolConfig::new("postgres://localhost/stock")).await?;
//!     let outcome = store.decrement_if_available(ItemId::new(1)).await?;
//!     println!("applied: {}, left: {}", outcome.applied, outcome.quantity);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod schema;
mod store;

pub use store::{PoolConfig, PostgresStockStore};

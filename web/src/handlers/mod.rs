//! HTTP request handlers.

pub mod checkout;
pub mod health;
pub mod metrics;
pub mod sse;
pub mod stock;

pub use checkout::checkout;
pub use health::{health_check, readiness_check};
pub use metrics::render_metrics;
pub use sse::stream_events;
pub use stock::current_stock;

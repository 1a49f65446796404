//! Error types for web handlers.
//!
//! [`AppError`] bridges [`StockError`] and HTTP responses by implementing
//! Axum's `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use stockwatch_core::StockError;

/// Application error type for web handlers.
///
/// Carries the status, a machine-readable code and a user-facing message.
/// The optional source is logged for server errors and never sent to clients.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code of this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 409 Conflict error for an exhausted item.
    #[must_use]
    pub fn out_of_stock(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "OUT_OF_STOCK")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE",
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    code: &'a str,
    message: String,
    /// Whether repeating the request may succeed
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            retryable: self.status == StatusCode::SERVICE_UNAVAILABLE,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match &err {
            StockError::NotFound(id) => Self::not_found("Item", id),
            StockError::Conflict => Self::out_of_stock(err.to_string()),
            StockError::StoreUnavailable(_) => {
                Self::unavailable("Stock store unavailable").with_source(anyhow::Error::new(err))
            }
            StockError::SubscriberUnresponsive(_) | StockError::InvalidRecord(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::ItemId;

    #[test]
    fn test_error_display() {
        let err = AppError::out_of_stock("Product X is out of stock");
        assert_eq!(err.to_string(), "[OUT_OF_STOCK] Product X is out of stock");
    }

    #[test]
    fn test_not_found_mapping() {
        let err = AppError::from(StockError::NotFound(ItemId::new(7)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "[NOT_FOUND] Item with id 7 not found");
    }

    #[test]
    fn test_store_unavailable_keeps_source() {
        let err = AppError::from(StockError::StoreUnavailable("connection reset".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
        assert!(std::error::Error::source(&err).is_some());
        // Internal detail stays out of the message
        assert!(!err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_conflict_is_out_of_stock() {
        let err = AppError::from(StockError::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "OUT_OF_STOCK");
    }
}

//! Error handling for the Stockroom server
//!
//! Business and validation failures carry a short message for the caller.
//! Dependency failures are logged with detail and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for a value that does not fit its numeric column
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not enough stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    /// Storage or an external service is unavailable
    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error means storage itself could not be reached
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::Database(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
                return AppError::Conflict(conflict_message(&constraint));
            }
            if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
                return AppError::Validation("Amount too large".to_string());
            }
        }
        AppError::Database(err)
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "products_owner_code_key" => "Product code already exists".to_string(),
        "users_email_lower_key" => "Email already in use".to_string(),
        "invoices_owner_code_key" => "Invoice code already issued".to_string(),
        other => format!("Duplicate value violates {}", other),
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", msg.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("CONFLICT", msg.clone()),
            ),
            AppError::InsufficientStock { .. } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INSUFFICIENT_STOCK", "Not enough stock"),
            ),
            AppError::Dependency(_) | AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("DEPENDENCY_ERROR", "Server error"),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (AppError::NotFound("Product".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                AppError::InsufficientStock { available: 1, requested: 2 },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Dependency("smtp".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_storage_unavailable() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_storage_unavailable());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_storage_unavailable());
        assert!(!AppError::NotFound("Invoice".into()).is_storage_unavailable());
    }

    #[test]
    fn test_conflict_messages() {
        assert_eq!(conflict_message("products_owner_code_key"), "Product code already exists");
        assert!(conflict_message("other_key").contains("other_key"));
    }
}

//! Error types for the HTTP surface and the durable store.
//!
//! - [`AppError`] - HTTP-facing errors rendered as a JSON envelope
//! - [`StoreError`] - categorized repository errors, classified by the store
//!   client from driver error codes

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Conflict { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Internal { message, .. } => f.write_str(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::Conflict { message, details } => {
                (StatusCode::CONFLICT, "conflict", message, details)
            }
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&e).unwrap_or_else(|_| json!({}));
        AppError::bad_request("Validation failed", details)
    }
}

/// Errors returned by repositories.
///
/// The category is decided from the driver's error classification, never by
/// inspecting error text.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violation{}", .constraint.as_deref().map(|c| format!(" on {c}")).unwrap_or_default())]
    UniqueViolation { constraint: Option<String> },

    #[error("store operation timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return StoreError::UniqueViolation {
                constraint: db.constraint().map(str::to_owned),
            };
        }

        match e {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { constraint } => AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": constraint }),
            ),
            StoreError::Timeout => AppError::internal("Database timeout", json!({})),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                AppError::internal("Database error", json!({}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err: AppError = StoreError::UniqueViolation {
            constraint: Some("links_slug_key".to_string()),
        }
        .into();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[test]
    fn test_pool_timeout_is_categorized() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Timeout));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_other_sqlx_errors_are_database_errors() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));

        let app: AppError = err.into();
        assert!(matches!(app, AppError::Internal { .. }));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::UniqueViolation {
            constraint: Some("links_slug_key".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unique constraint violation on links_slug_key"
        );

        let err = StoreError::UniqueViolation { constraint: None };
        assert_eq!(err.to_string(), "unique constraint violation");
    }

    #[test]
    fn test_validation_errors_map_to_bad_request() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("url", validator::ValidationError::new("url"));

        let err: AppError = errors.into();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_error_response_status() {
        let response = AppError::not_found("Short link not found", json!({})).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::bad_request("Invalid URL", json!({})).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Classification
//! Callers receive a clear category, sufficient to render an actionable
//! message, and nothing more:
//! ```text
//! 401 UNAUTHENTICATED      no (or unknown) acting user
//! 400 VALIDATION_ERROR     malformed/missing input, empty sale
//! 404 NOT_FOUND            unknown product/sale/customer/session
//! 409 INSUFFICIENT_STOCK   deduction would drive stock negative
//! 409 CONFLICT             terminal-state re-review, cancelled-sale ops
//! 422 BUSINESS_LOGIC       other rule violations (loyalty, pricing)
//! 500 DATABASE_ERROR       infrastructure failure; detail logged
//!                          server-side, never leaked to the caller
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use duka_core::CoreError;
use duka_db::DbError;

/// API error returned from HTTP handlers.
///
/// Serialized as `{ "code": "...", "message": "..." }`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling.
    pub code: ErrorCode,

    /// Human-readable error message for display.
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No acting user attached to the request (401).
    Unauthenticated,

    /// Input validation failed (400).
    ValidationError,

    /// Resource not found (404).
    NotFound,

    /// Deduction would drive stock negative (409).
    InsufficientStock,

    /// State conflict, e.g. re-reviewing a terminal stock take (409).
    Conflict,

    /// Other business rule violation (422).
    BusinessLogic,

    /// Database operation failed (500).
    DatabaseError,

    /// Internal server error (500).
    Internal,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::BusinessLogic => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates an unauthenticated error.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        (
            status,
            Json(json!({ "code": self.code, "message": self.message })),
        )
            .into_response()
    }
}

/// Converts business-rule violations to classified API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::StockTakeNotFound(_) => ErrorCode::NotFound,

            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,

            CoreError::StockTakeAlreadyReviewed { .. } | CoreError::InvalidSaleStatus { .. } => {
                ErrorCode::Conflict
            }

            CoreError::EmptySale
            | CoreError::InvalidUnitType(_)
            | CoreError::TotalMismatch { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,

            CoreError::ProductInactive { .. }
            | CoreError::MissingPriceConfiguration { .. }
            | CoreError::InsufficientPoints { .. }
            | CoreError::InvalidRedeemAmount { .. } => ErrorCode::BusinessLogic,
        };

        ApiError::new(code, err.to_string())
    }
}

/// Converts database errors to API errors.
///
/// Infrastructure detail is logged server-side and replaced with a
/// generic message; business-rule violations pass through classified.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => ApiError::from(core),

            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),

            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),

            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }

            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }

            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }

            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }

            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }

            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }

            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_maps_to_conflict() {
        let err = ApiError::from(CoreError::InsufficientStock {
            sku: "SODA-300".to_string(),
            available: 2,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_empty_sale_maps_to_bad_request() {
        let err = ApiError::from(CoreError::EmptySale);
        assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_detail_not_leaked() {
        let err = ApiError::from(DbError::QueryFailed(
            "secret table layout detail".to_string(),
        ));
        assert!(!err.message.contains("secret"));
        assert_eq!(err.code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

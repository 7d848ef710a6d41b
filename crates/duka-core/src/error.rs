//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  duka-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  duka-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  API errors (in app)                                                │
//! │  └── ApiError         - What HTTP clients see (status + message)    │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They abort the in-flight transaction and are surfaced to the caller with
/// a descriptive message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been deactivated and cannot be sold.
    #[error("Product {sku} is inactive")]
    ProductInactive { sku: String },

    /// Insufficient stock to complete a deduction.
    ///
    /// ## When This Occurs
    /// - A sale requests more base units than are on hand
    /// - A stock-take variance would drive live quantity negative
    ///   (concurrent sales since the count was submitted)
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Unit type string is not one of piece/pack/dozen.
    #[error("Invalid unit type: {0}")]
    InvalidUnitType(String),

    /// The product has no buying price configured for the requested unit.
    ///
    /// A buying price of zero is treated as "not configured". A selling
    /// price of zero resolves successfully (free/promo items) and is only
    /// flagged for review by callers.
    #[error("No {unit} buying price configured for {sku}")]
    MissingPriceConfiguration { sku: String, unit: String },

    /// Sale submitted with no line items.
    #[error("Sale must contain at least one item")]
    EmptySale,

    /// Caller-supplied total disagrees with the recomputed one.
    ///
    /// Totals are always recomputed from line items + delivery fee; a
    /// mismatched client total is rejected rather than trusted.
    #[error("Sale total mismatch: submitted {submitted}, computed {computed}")]
    TotalMismatch { submitted: i64, computed: i64 },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Customer cannot be found (loyalty operations require one).
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Redemption requested more points than the customer holds.
    #[error("Insufficient loyalty points: available {available}, requested {requested}")]
    InsufficientPoints { available: i64, requested: i64 },

    /// Redemption amount is non-positive or off the policy increment.
    #[error("Invalid redeem amount {points}: must be a positive multiple of {increment}")]
    InvalidRedeemAmount { points: i64, increment: i64 },

    /// Stock-take session not found.
    #[error("Stock take session not found: {0}")]
    StockTakeNotFound(String),

    /// Stock-take session has already reached a terminal state.
    ///
    /// `pending → applied` and `pending → rejected` happen exactly once;
    /// re-invoking apply/reject is rejected so variance is never applied
    /// twice.
    #[error("Stock take session {session_id} is already {status}")]
    StockTakeAlreadyReviewed { session_id: String, status: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when request input doesn't meet requirements. Used for early
/// validation at the boundary, before any transaction opens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "SUGAR-1KG".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for SUGAR-1KG: available 3, requested 5"
        );

        let err = CoreError::InvalidRedeemAmount {
            points: 55,
            increment: 100,
        };
        assert_eq!(
            err.to_string(),
            "Invalid redeem amount 55: must be a positive multiple of 100"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

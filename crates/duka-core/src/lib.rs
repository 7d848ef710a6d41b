//! # duka-core: Pure Business Logic for Duka POS
//!
//! This crate is the heart of Duka POS. It contains all business logic as
//! pure functions and types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Duka POS Architecture                         │
//! │                                                                     │
//! │  HTTP API (apps/api)                                                │
//! │       │  create sale, receive stock, stock takes                    │
//! │       ▼                                                             │
//! │  ★ duka-core (THIS CRATE) ★                                         │
//! │    types • money • units • loyalty • validation                     │
//! │    NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS               │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  duka-db (stock ledger, sale orchestrator, SQLite)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, StockLogEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`units`] - Unit pricing resolver (piece/pack/dozen)
//! - [`loyalty`] - Loyalty accrual/redemption policy math
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, same input = same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod loyalty;
pub mod money;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::LoyaltyPolicy;
pub use money::Money;
pub use types::*;
pub use units::{base_units_per_unit, resolve, UnitPricing, UnitType, DOZEN_SIZE};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single sale.
///
/// Prevents runaway requests and keeps transactions bounded. Can be made
/// configurable per-store in future versions.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against fat-finger entry (e.g., 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

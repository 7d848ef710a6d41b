//! # Domain Types
//!
//! Core domain types used throughout Duka POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  Product ──< SaleItem >── Sale ──── Expense (delivery fee)          │
//! │     │                       │                                       │
//! │     │                       └── Customer ── LoyaltyPoints           │
//! │     │                                  └─── LoyaltyTransaction      │
//! │     ├──< StockLogEntry        (append-only movement ledger)         │
//! │     └──< StockTakeItem >── StockTakeSession                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants Carried By These Types
//! - `Product.quantity` is always a base-unit count and is mutated only by
//!   the stock ledger; it never goes negative.
//! - `Sale.total_amount` equals the sum of its items' totals plus the
//!   delivery fee.
//! - `StockLogEntry` and `LoyaltyTransaction` rows are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::units::UnitType;

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale recorded but not yet concluded (e.g., credit awaiting payment).
    Pending,
    /// Sale concluded. The default for new sales.
    Completed,
    /// Sale reversed; stock restored through the ledger.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Payment Method / Status
// =============================================================================

/// How a sale or expense was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Card,
    Credit,
}

/// Settlement state of a sale's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment received in full. The default for new sales.
    Paid,
    Pending,
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Paid
    }
}

// =============================================================================
// Stock Movement Source
// =============================================================================

/// Why a stock quantity changed. Every ledger entry carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StockSource {
    /// Goods received into stock (positive delta).
    Receive,
    /// Deduction from a sale (negative delta).
    Sale,
    /// Variance applied from an approved stock-take.
    StockTake,
    /// Manual correction, including sale-cancellation reversals.
    Adjustment,
}

// =============================================================================
// Stock-Take Status
// =============================================================================

/// Lifecycle of a stock-take session: `pending → applied | rejected`,
/// exactly once; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StockTakeStatus {
    Pending,
    Applied,
    Rejected,
}

impl StockTakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTakeStatus::Pending => "pending",
            StockTakeStatus::Applied => "applied",
            StockTakeStatus::Rejected => "rejected",
        }
    }
}

// =============================================================================
// Loyalty Enums
// =============================================================================

/// Customer loyalty tier; determines the point accrual multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

impl Default for LoyaltyTier {
    fn default() -> Self {
        LoyaltyTier::Bronze
    }
}

/// Direction of a loyalty point movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTxKind {
    Earn,
    Redeem,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// ## Quantity Semantics
/// `quantity` is always expressed in **base units** (`stock_unit`,
/// typically "piece"). Pack and dozen prices are selling denominations
/// over the same stock pool, converted via `pack_size` and the fixed
/// dozen multiplier — never separate inventories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Optional category reference.
    pub category_id: Option<String>,

    /// Base stock-counting unit (informational; "piece").
    pub stock_unit: String,

    /// Current stock level in base units. Mutated only by the stock ledger.
    pub quantity: i64,

    /// Reorder threshold in base units.
    pub min_quantity: i64,

    /// Base units per pack for this product (commonly 3).
    pub pack_size: i64,

    /// Per-unit buying prices in cents. Zero means "not configured".
    pub piece_buying_price: i64,
    pub pack_buying_price: i64,
    pub dozen_buying_price: i64,

    /// Per-unit selling prices in cents. Zero is allowed (promo items).
    pub piece_selling_price: i64,
    pub pack_selling_price: i64,
    pub dozen_selling_price: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether this product is below its reorder threshold.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

/// A category grouping products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// None for walk-in customers.
    pub customer_id: Option<String>,
    /// Staff member who recorded the sale.
    pub user_id: String,
    pub store_id: String,
    /// Sum of item totals plus delivery fee, in cents.
    pub total_amount: i64,
    pub delivery_fee: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: SaleStatus,
    pub amount_paid: i64,
    pub change_amount: i64,
    /// May be backdated for historical sales.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount)
    }
}

/// A line item in a sale. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Denomination this line was sold in.
    pub unit_type: UnitType,
    /// Count of units at `unit_type` (not base units).
    pub quantity: i64,
    /// Price per unit at `unit_type`, in cents, frozen at sale time.
    pub unit_price: i64,
    /// quantity × unit_price, in cents.
    pub total: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.total)
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// One entry in the append-only stock movement ledger.
///
/// The running sum of `quantity_added` for a product, plus any seed
/// quantity, always equals the product's live `quantity`. Entries are
/// never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLogEntry {
    pub id: String,
    pub product_id: String,
    /// Signed base-unit delta: positive for receive, negative for
    /// deduction. Zero-sum corrections are recorded too.
    pub quantity_added: i64,
    /// Denomination the movement was expressed in by its originator.
    pub unit_type: UnitType,
    /// Total cost of the movement in cents (buying cost for receives,
    /// selling value for sales).
    pub total_cost: i64,
    pub source: StockSource,
    /// Acting staff member.
    pub user_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Take
// =============================================================================

/// A physical count session awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTakeSession {
    pub id: String,
    pub store_id: String,
    pub submitted_by: String,
    pub reviewed_by: Option<String>,
    pub status: StockTakeStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// One counted product within a stock-take session.
///
/// Product details are snapshotted at submission time so the row stays
/// meaningful even if the product is later removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTakeItem {
    pub id: String,
    pub session_id: String,
    pub product_id: Option<String>,
    /// Name at submission time (frozen).
    pub product_name: String,
    /// SKU at submission time (frozen).
    pub sku: String,
    /// Category name at submission time (frozen).
    pub category_name: Option<String>,
    /// Product.quantity at submission time, in base units.
    pub system_quantity: i64,
    /// Physically counted quantity, in base units.
    pub counted_quantity: i64,
    /// counted_quantity − system_quantity.
    pub variance: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Customer & Loyalty
// =============================================================================

/// A known customer (as opposed to a walk-in).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub tier: LoyaltyTier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Running loyalty point balance for a customer.
///
/// Invariant: equals the signed sum of the customer's
/// [`LoyaltyTransaction`] points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoyaltyPoints {
    pub customer_id: String,
    pub points: i64,
    pub updated_at: DateTime<Utc>,
}

/// One append-only loyalty point movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoyaltyTransaction {
    pub id: String,
    pub customer_id: String,
    pub sale_id: Option<String>,
    /// Signed: positive for earn, negative for redeem.
    pub points: i64,
    pub kind: LoyaltyTxKind,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense. Delivery expenses are auto-created by the sale
/// orchestrator with category "Delivery" and a description referencing
/// the originating sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: String,
    pub description: String,
    /// Amount in cents.
    pub amount: i64,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub user_id: String,
    pub store_id: String,
    pub expense_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users & Stores
// =============================================================================

/// A staff member able to act on the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// A store (tenant) within the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Store {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

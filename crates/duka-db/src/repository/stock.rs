//! # Stock Ledger
//!
//! The single serialized path through which product quantities change.
//!
//! ## Why One Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Concurrent writers of products.quantity:                           │
//! │                                                                     │
//! │    Sale ─────────────┐                                              │
//! │    Receive ──────────┼──► adjust() ──► UPDATE products              │
//! │    Stock-take apply ─┤       │         SET quantity = quantity + δ  │
//! │    Cancellation ─────┘       │         WHERE id = ?                 │
//! │                              │           AND quantity + δ >= 0      │
//! │                              ▼                                      │
//! │                      INSERT stock_logs  (append-only, one per call) │
//! │                                                                     │
//! │  The conditional UPDATE makes check-then-act races lose cleanly:    │
//! │  a deduction that would go negative affects zero rows and the       │
//! │  caller's transaction aborts with InsufficientStock.                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ledger is unit-agnostic: deltas arrive already converted to base
//! units. Receiving converts via the unit pricing resolver before
//! calling in.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use duka_core::validation::{validate_amount_cents, validate_quantity};
use duka_core::{resolve, CoreError, Product, StockLogEntry, StockSource, UnitType, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::product;

const STOCK_LOG_COLS: &str =
    "id, product_id, quantity_added, unit_type, total_cost, source, user_id, notes, created_at";

// =============================================================================
// Adjustment (transaction-scoped)
// =============================================================================

/// One requested stock movement, expressed in base units.
#[derive(Debug, Clone)]
pub(crate) struct StockAdjustment {
    pub product_id: String,
    /// Signed base-unit delta. Zero is legal and still logged.
    pub delta_base_units: i64,
    /// Denomination the originating operation was expressed in.
    pub unit_type: UnitType,
    /// Movement value in cents (buying cost or selling value).
    pub total_cost: i64,
    pub source: StockSource,
    pub user_id: String,
    pub notes: Option<String>,
}

/// Applies one stock movement inside the caller's transaction.
///
/// ## Guarantees
/// - The read-modify-write of `products.quantity` is a single
///   conditional UPDATE, so concurrent movements serialize on the row
///   and a delta that would drive quantity negative fails with
///   [`CoreError::InsufficientStock`] before any log row is written.
/// - Exactly one `stock_logs` row per successful call — including
///   zero-sum corrections, which keeps the ledger a complete
///   explanation of every quantity the product has ever had.
pub(crate) async fn adjust(
    conn: &mut SqliteConnection,
    adj: StockAdjustment,
) -> DbResult<StockLogEntry> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ?2, updated_at = ?3
         WHERE id = ?1 AND quantity + ?2 >= 0",
    )
    .bind(&adj.product_id)
    .bind(adj.delta_base_units)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Zero rows means the product is missing or the delta would go
        // negative; a follow-up read tells the two apart.
        return match product::get_tx(conn, &adj.product_id).await? {
            None => Err(DbError::not_found("Product", &adj.product_id)),
            Some(p) => Err(CoreError::InsufficientStock {
                sku: p.sku,
                available: p.quantity,
                requested: -adj.delta_base_units,
            }
            .into()),
        };
    }

    let entry = StockLogEntry {
        id: Uuid::new_v4().to_string(),
        product_id: adj.product_id,
        quantity_added: adj.delta_base_units,
        unit_type: adj.unit_type,
        total_cost: adj.total_cost,
        source: adj.source,
        user_id: adj.user_id,
        notes: adj.notes,
        created_at: now,
    };

    sqlx::query(
        "INSERT INTO stock_logs (
            id, product_id, quantity_added, unit_type, total_cost,
            source, user_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(entry.quantity_added)
    .bind(entry.unit_type)
    .bind(entry.total_cost)
    .bind(entry.source)
    .bind(&entry.user_id)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %entry.product_id,
        delta = entry.quantity_added,
        source = ?entry.source,
        "Stock adjusted"
    );

    Ok(entry)
}

// =============================================================================
// Receiving
// =============================================================================

/// Input for receiving stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: String,
    /// Count of units at `unit_type` (not base units).
    pub quantity: i64,
    pub unit_type: UnitType,
    /// Purchase cost per unit at `unit_type`, in cents.
    pub buying_price: i64,
    /// New selling price per unit at `unit_type`, in cents.
    pub selling_price: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives stock for a product.
    ///
    /// ## What This Does (one transaction)
    /// 1. Refreshes the product's buying/selling price for the received
    ///    denomination (the latest purchase cost wins)
    /// 2. Converts the received quantity to base units via the unit
    ///    pricing resolver
    /// 3. Adjusts the stock ledger with source `receive`
    pub async fn receive(&self, input: ReceiveStock, actor_id: &str) -> DbResult<Product> {
        validate_quantity(input.quantity).map_err(CoreError::from)?;
        if input.buying_price <= 0 {
            return Err(CoreError::from(ValidationError::MustBePositive {
                field: "buying_price".to_string(),
            })
            .into());
        }
        validate_amount_cents("selling_price", input.selling_price)
            .map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let product = product::get_tx(&mut tx, &input.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &input.product_id))?;

        if input.selling_price == 0 {
            warn!(
                sku = %product.sku,
                unit = %input.unit_type,
                "Stock received with zero selling price, flagged for review"
            );
        }

        product::update_unit_prices_tx(
            &mut tx,
            &product.id,
            input.unit_type,
            input.buying_price,
            input.selling_price,
        )
        .await?;

        // Re-read so the resolver sees the refreshed prices.
        let product = product::get_tx(&mut tx, &input.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &input.product_id))?;
        let pricing = resolve(&product, input.unit_type)?;

        adjust(
            &mut tx,
            StockAdjustment {
                product_id: product.id.clone(),
                delta_base_units: pricing.base_units(input.quantity),
                unit_type: input.unit_type,
                total_cost: input.buying_price * input.quantity,
                source: StockSource::Receive,
                user_id: actor_id.to_string(),
                notes: input.notes,
            },
        )
        .await?;

        let product = product::get_tx(&mut tx, &input.product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &input.product_id))?;

        tx.commit().await?;

        info!(
            sku = %product.sku,
            quantity = input.quantity,
            unit = %input.unit_type,
            new_stock = product.quantity,
            "Stock received"
        );

        Ok(product)
    }

    /// Lists a product's ledger entries, oldest first.
    pub async fn logs_for_product(&self, product_id: &str) -> DbResult<Vec<StockLogEntry>> {
        let logs = sqlx::query_as::<_, StockLogEntry>(&format!(
            "SELECT {STOCK_LOG_COLS} FROM stock_logs
             WHERE product_id = ?1 ORDER BY created_at, id"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    /// Signed sum of all ledger deltas for a product.
    ///
    /// Added to the product's seed quantity this must always equal the
    /// live quantity; reconciliation reports compare the two.
    pub async fn ledger_sum(&self, product_id: &str) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity_added) FROM stock_logs WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

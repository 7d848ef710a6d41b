//! # Sale Repository
//!
//! The sale transaction orchestrator.
//!
//! ## Sale Creation (single pass, all-or-nothing)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  create_sale(input, actor)                                          │
//! │                                                                     │
//! │  1. VALIDATE (no transaction yet)                                   │
//! │     └── at least one item, sane quantities and amounts              │
//! │                                                                     │
//! │  2. BEGIN TRANSACTION                                               │
//! │     ├── per item: resolve unit pricing, deduct stock via ledger     │
//! │     │   (InsufficientStock on ANY item aborts the whole sale)       │
//! │     ├── insert sale + sale_items (totals recomputed server-side)    │
//! │     ├── loyalty: redeem requested points, accrue earned points      │
//! │     └── delivery_fee > 0: insert linked "Delivery" expense          │
//! │                                                                     │
//! │  3. COMMIT — or roll back EVERYTHING on any failure                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No partial state survives a failure: no sale row, no items, no stock
//! deduction, no loyalty movement, no expense.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use duka_core::validation::{validate_amount_cents, validate_quantity, validate_sale_size};
use duka_core::{
    base_units_per_unit, resolve, CoreError, Customer, LoyaltyPolicy, Money, PaymentMethod,
    PaymentStatus, Sale, SaleItem, SaleStatus, StockSource, UnitType, ValidationError,
};

use crate::error::{DbError, DbResult};
use crate::repository::expense::{self, NewExpense};
use crate::repository::loyalty as loyalty_repo;
use crate::repository::product;
use crate::repository::stock::{self, StockAdjustment};

const SALE_COLS: &str = "id, customer_id, user_id, store_id, total_amount, delivery_fee, \
     payment_method, payment_status, status, amount_paid, change_amount, created_at, updated_at";

const SALE_ITEM_COLS: &str =
    "id, sale_id, product_id, unit_type, quantity, unit_price, total, created_at";

// =============================================================================
// Input / Output Types
// =============================================================================

/// One requested line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub product_id: String,
    /// Count of units at `unit_type`.
    pub quantity: i64,
    pub unit_type: UnitType,
    /// Price per unit in cents. When absent, the product's configured
    /// selling price for `unit_type` is resolved and used.
    #[serde(default)]
    pub unit_price: Option<i64>,
}

/// Input for creating a sale.
///
/// Defaults are part of this contract, not scattered fallbacks: an
/// omitted `status` means completed, an omitted `payment_status` means
/// paid, and an omitted `amount_paid` means paid-in-full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSale {
    pub items: Vec<SaleItemInput>,
    pub payment_method: PaymentMethod,
    pub store_id: String,
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    /// None records a walk-in sale.
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub delivery_fee: i64,
    /// Optional client-side total, verified against the recomputed one.
    #[serde(default)]
    pub total: Option<i64>,
    /// Loyalty points to redeem against this sale. Requires a customer.
    #[serde(default)]
    pub redeem_points: Option<i64>,
    /// Backdates the sale (historical entry). Validation and stock
    /// logic are unaffected; only the persisted timestamp changes.
    #[serde(default)]
    pub historical_date: Option<DateTime<Utc>>,
}

/// A persisted sale with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Outcome of a successful sale creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// Loyalty points accrued on this sale (zero for walk-ins).
    pub points_earned: i64,
    /// Discount in cents granted by redeemed points.
    pub loyalty_discount: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale orchestration and queries.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    loyalty_policy: LoyaltyPolicy,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, loyalty_policy: LoyaltyPolicy) -> Self {
        SaleRepository {
            pool,
            loyalty_policy,
        }
    }

    /// Creates a sale atomically: stock deduction, sale + items, loyalty
    /// movement and delivery expense all commit together or not at all.
    pub async fn create_sale(&self, input: CreateSale, actor_id: &str) -> DbResult<CreatedSale> {
        // ---- Validation, before any transaction opens ------------------
        if input.items.is_empty() {
            return Err(CoreError::EmptySale.into());
        }
        validate_sale_size(input.items.len()).map_err(CoreError::from)?;
        for item in &input.items {
            validate_quantity(item.quantity).map_err(CoreError::from)?;
            if let Some(price) = item.unit_price {
                validate_amount_cents("unit_price", price).map_err(CoreError::from)?;
            }
        }
        validate_amount_cents("delivery_fee", input.delivery_fee).map_err(CoreError::from)?;
        if let Some(paid) = input.amount_paid {
            validate_amount_cents("amount_paid", paid).map_err(CoreError::from)?;
        }
        if input.redeem_points.is_some() && input.customer_id.is_none() {
            return Err(CoreError::from(ValidationError::Required {
                field: "customer_id".to_string(),
            })
            .into());
        }

        let status = input.status.unwrap_or_default();
        let payment_status = input.payment_status.unwrap_or_default();

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let created_at = input.historical_date.unwrap_or(now);

        // ---- Atomic section --------------------------------------------
        let mut tx = self.pool.begin().await?;

        // Resolve the customer up front: a bad reference should read as
        // not-found, not as a constraint violation at insert time.
        let customer = match &input.customer_id {
            Some(customer_id) => Some(
                get_customer_tx(&mut tx, customer_id)
                    .await?
                    .ok_or_else(|| {
                        DbError::from(CoreError::CustomerNotFound(customer_id.clone()))
                    })?,
            ),
            None => None,
        };

        let mut items: Vec<SaleItem> = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = product::get_tx(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| {
                    DbError::from(CoreError::ProductNotFound(line.product_id.clone()))
                })?;
            if !product.is_active {
                return Err(CoreError::ProductInactive { sku: product.sku }.into());
            }

            let unit_price = match line.unit_price {
                Some(price) => price,
                None => resolve(&product, line.unit_type)?.selling_price.cents(),
            };
            if unit_price == 0 {
                warn!(
                    sku = %product.sku,
                    unit = %line.unit_type,
                    "Sale line at zero selling price, flagged for review"
                );
            }
            let line_total = unit_price * line.quantity;

            let base_units = line.quantity * base_units_per_unit(&product, line.unit_type);
            stock::adjust(
                &mut tx,
                StockAdjustment {
                    product_id: product.id.clone(),
                    delta_base_units: -base_units,
                    unit_type: line.unit_type,
                    total_cost: line_total,
                    source: StockSource::Sale,
                    user_id: actor_id.to_string(),
                    notes: Some(format!("Sale {sale_id}")),
                },
            )
            .await?;

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: product.id,
                unit_type: line.unit_type,
                quantity: line.quantity,
                unit_price,
                total: line_total,
                created_at,
            });
        }

        let subtotal: i64 = items.iter().map(|i| i.total).sum();
        let total_amount = subtotal + input.delivery_fee;
        if let Some(submitted) = input.total {
            if submitted != total_amount {
                return Err(CoreError::TotalMismatch {
                    submitted,
                    computed: total_amount,
                }
                .into());
            }
        }

        // The discount is policy math only; whether the customer can
        // actually cover the points is enforced by redeem_tx below, and
        // a failure there rolls the whole sale back.
        let loyalty_discount = match input.redeem_points {
            Some(points) => self.loyalty_policy.redeem_discount(points),
            None => Money::zero(),
        };

        let amount_paid = input.amount_paid.unwrap_or(total_amount);
        let change_amount = (amount_paid + loyalty_discount.cents() - total_amount).max(0);

        let sale = Sale {
            id: sale_id.clone(),
            customer_id: input.customer_id.clone(),
            user_id: actor_id.to_string(),
            store_id: input.store_id.clone(),
            total_amount,
            delivery_fee: input.delivery_fee,
            payment_method: input.payment_method,
            payment_status,
            status,
            amount_paid,
            change_amount,
            created_at,
            updated_at: now,
        };

        insert_sale_tx(&mut tx, &sale).await?;
        for item in &items {
            insert_item_tx(&mut tx, item).await?;
        }

        // ---- Loyalty (same transaction; never commits on its own) -----
        // Runs after the sale row exists so the movement can reference
        // it; redemption is validated against the pre-earn balance.
        let mut points_earned = 0;
        if let Some(customer) = &customer {
            if let Some(points) = input.redeem_points {
                loyalty_repo::redeem_tx(
                    &mut tx,
                    &self.loyalty_policy,
                    &customer.id,
                    &sale_id,
                    points,
                )
                .await?;
            }

            if payment_status == PaymentStatus::Paid {
                points_earned = loyalty_repo::earn_tx(
                    &mut tx,
                    &self.loyalty_policy,
                    &customer.id,
                    &sale_id,
                    Money::from_cents(subtotal),
                    customer.tier,
                )
                .await?;
            }
        }

        if input.delivery_fee > 0 {
            expense::insert_tx(
                &mut tx,
                NewExpense {
                    description: format!("Delivery for sale {sale_id}"),
                    amount: input.delivery_fee,
                    category: "Delivery".to_string(),
                    payment_method: input.payment_method,
                    user_id: actor_id.to_string(),
                    store_id: input.store_id.clone(),
                    expense_date: created_at,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total = sale.total_amount,
            items = items.len(),
            points_earned,
            "Sale created"
        );

        Ok(CreatedSale {
            sale,
            items,
            points_earned,
            loyalty_discount: loyalty_discount.cents(),
        })
    }

    /// Cancels a sale, restoring each line's base-unit deduction through
    /// the ledger in the same transaction.
    ///
    /// Hard deletion is deliberately not supported once stock has moved;
    /// cancellation is the only reversal path and keeps the ledger's
    /// running sum equal to live quantity.
    pub async fn cancel_sale(&self, sale_id: &str, actor_id: &str) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = get_sale_tx(&mut tx, sale_id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::SaleNotFound(sale_id.to_string())))?;
        if sale.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: sale.status.as_str().to_string(),
            }
            .into());
        }

        let items = get_items_tx(&mut tx, sale_id).await?;
        for item in &items {
            let product = product::get_tx(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &item.product_id))?;
            let base_units = item.quantity * base_units_per_unit(&product, item.unit_type);

            stock::adjust(
                &mut tx,
                StockAdjustment {
                    product_id: product.id,
                    delta_base_units: base_units,
                    unit_type: item.unit_type,
                    total_cost: item.total,
                    source: StockSource::Adjustment,
                    user_id: actor_id.to_string(),
                    notes: Some(format!("Sale {sale_id} cancelled")),
                },
            )
            .await?;
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE sales SET status = 'cancelled', updated_at = ?2
             WHERE id = ?1 AND status != 'cancelled'",
        )
        .bind(sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: SaleStatus::Cancelled.as_str().to_string(),
            }
            .into());
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, items = items.len(), "Sale cancelled, stock restored");

        Ok(Sale {
            status: SaleStatus::Cancelled,
            updated_at: now,
            ..sale
        })
    }

    /// Gets a sale with its line items.
    pub async fn get_with_items(&self, sale_id: &str) -> DbResult<Option<SaleWithItems>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLS} FROM sales WHERE id = ?1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(sale) = sale else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SaleWithItems { sale, items }))
    }
}

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

async fn get_sale_tx(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLS} FROM sales WHERE id = ?1"))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

async fn get_items_tx(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {SALE_ITEM_COLS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn get_customer_tx(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, name, phone, tier, is_active, created_at FROM customers WHERE id = ?1",
    )
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}

async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sales (
            id, customer_id, user_id, store_id, total_amount, delivery_fee,
            payment_method, payment_status, status, amount_paid, change_amount,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&sale.id)
    .bind(&sale.customer_id)
    .bind(&sale.user_id)
    .bind(&sale.store_id)
    .bind(sale.total_amount)
    .bind(sale.delivery_fee)
    .bind(sale.payment_method)
    .bind(sale.payment_status)
    .bind(sale.status)
    .bind(sale.amount_paid)
    .bind(sale.change_amount)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item_tx(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_items (
            id, sale_id, product_id, unit_type, quantity, unit_price, total, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.unit_type)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.total)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use duka_core::{
        CoreError, LoyaltyTier, PaymentMethod, PaymentStatus, SaleStatus, StockSource, UnitType,
    };

    use super::{CreateSale, SaleItemInput};
    use crate::repository::testing::{seed_base, seed_customer, seed_product, test_db};
    use crate::DbError;

    fn sale_input(store_id: &str, items: Vec<SaleItemInput>) -> CreateSale {
        CreateSale {
            items,
            payment_method: PaymentMethod::Cash,
            store_id: store_id.to_string(),
            status: None,
            payment_status: None,
            amount_paid: None,
            customer_id: None,
            delivery_fee: 0,
            total: None,
            redeem_points: None,
            historical_date: None,
        }
    }

    fn pieces(product_id: &str, quantity: i64) -> SaleItemInput {
        SaleItemInput {
            product_id: product_id.to_string(),
            quantity,
            unit_type: UnitType::Piece,
            unit_price: None,
        }
    }

    #[tokio::test]
    async fn test_sale_deducts_stock_and_logs() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let created = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 3)]), &user_id)
            .await
            .unwrap();

        // Defaults applied explicitly
        assert_eq!(created.sale.status, SaleStatus::Completed);
        assert_eq!(created.sale.payment_status, PaymentStatus::Paid);
        // Piece selling price 40.00 × 3
        assert_eq!(created.sale.total_amount, 12_000);
        assert_eq!(created.sale.amount_paid, 12_000);

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 7);

        let logs = db.stock().logs_for_product(&product.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].quantity_added, -3);
        assert_eq!(logs[0].source, StockSource::Sale);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 2).await;

        let err = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 5)]), &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            })
        ));

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 2);
        assert!(db
            .stock()
            .logs_for_product(&product.id)
            .await
            .unwrap()
            .is_empty());

        let sale_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(sale_count, 0);
    }

    #[tokio::test]
    async fn test_failure_mid_cart_leaves_no_partial_state() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let plenty = seed_product(&db, "SODA-300", 10).await;
        let scarce = seed_product(&db, "BREAD-400", 1).await;

        let err = db
            .sales()
            .create_sale(
                sale_input(
                    &store_id,
                    vec![pieces(&plenty.id, 2), pieces(&scarce.id, 5)],
                ),
                &user_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        // Item 1's deduction must not survive item 2's failure
        let live = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
        assert_eq!(live.quantity, 10);
        assert!(db
            .stock()
            .logs_for_product(&plenty.id)
            .await
            .unwrap()
            .is_empty());

        let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(item_count, 0);
    }

    #[tokio::test]
    async fn test_empty_sale_rejected_before_transaction() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;

        let err = db
            .sales()
            .create_sale(sale_input(&store_id, vec![]), &user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptySale)));
    }

    #[tokio::test]
    async fn test_unit_types_consume_base_units() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 24).await;

        let created = db
            .sales()
            .create_sale(
                sale_input(
                    &store_id,
                    vec![
                        SaleItemInput {
                            product_id: product.id.clone(),
                            quantity: 2,
                            unit_type: UnitType::Pack,
                            unit_price: None,
                        },
                        SaleItemInput {
                            product_id: product.id.clone(),
                            quantity: 1,
                            unit_type: UnitType::Dozen,
                            unit_price: None,
                        },
                    ],
                ),
                &user_id,
            )
            .await
            .unwrap();

        // 2 packs × 110.00 + 1 dozen × 420.00, resolved from the catalog
        assert_eq!(created.sale.total_amount, 22_000 + 42_000);

        // 2 packs of 3 + 1 dozen = 18 base units
        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 6);
    }

    #[tokio::test]
    async fn test_missing_pack_price_rejected() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let mut product = seed_product(&db, "SODA-300", 24).await;

        // Clear the pack buying price: pack pricing is now unconfigured
        sqlx::query("UPDATE products SET pack_buying_price = 0 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();
        product.pack_buying_price = 0;

        let err = db
            .sales()
            .create_sale(
                sale_input(
                    &store_id,
                    vec![SaleItemInput {
                        product_id: product.id.clone(),
                        quantity: 1,
                        unit_type: UnitType::Pack,
                        unit_price: None,
                    }],
                ),
                &user_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::MissingPriceConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_total_consistency_and_mismatch_rejection() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let mut input = sale_input(&store_id, vec![pieces(&product.id, 2)]);
        input.delivery_fee = 10_000;
        input.total = Some(8_000 + 10_000);
        let created = db.sales().create_sale(input, &user_id).await.unwrap();

        let item_sum: i64 = created.items.iter().map(|i| i.total).sum();
        assert_eq!(created.sale.total_amount, item_sum + created.sale.delivery_fee);

        // A disagreeing client total is rejected, not trusted
        let mut bad = sale_input(&store_id, vec![pieces(&product.id, 2)]);
        bad.total = Some(999);
        let err = db.sales().create_sale(bad, &user_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::TotalMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_delivery_fee_creates_linked_expense() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let mut input = sale_input(&store_id, vec![pieces(&product.id, 1)]);
        input.delivery_fee = 10_000;
        let created = db.sales().create_sale(input, &user_id).await.unwrap();

        assert_eq!(created.sale.total_amount, 4_000 + 10_000);

        let expenses = db.expenses().list_for_store(&store_id, 10).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, 10_000);
        assert_eq!(expenses[0].category, "Delivery");
        assert!(expenses[0].description.contains(&created.sale.id));
    }

    #[tokio::test]
    async fn test_loyalty_earn_on_paid_sale() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 100).await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Silver).await;

        let mut input = sale_input(&store_id, vec![pieces(&product.id, 10)]);
        input.customer_id = Some(customer_id.clone());
        input.delivery_fee = 5_000;
        let created = db.sales().create_sale(input, &user_id).await.unwrap();

        // Earned on the items subtotal (KSh 400), not the delivery fee:
        // 400 × 1.5 = 600 points
        assert_eq!(created.points_earned, 600);
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 600);

        let txs = db.loyalty().transactions(&customer_id).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].points, 600);
        assert_eq!(txs[0].sale_id.as_deref(), Some(created.sale.id.as_str()));
    }

    #[tokio::test]
    async fn test_no_loyalty_on_pending_payment_or_walk_in() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 100).await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Gold).await;

        // Pending payment: no accrual yet
        let mut input = sale_input(&store_id, vec![pieces(&product.id, 5)]);
        input.customer_id = Some(customer_id.clone());
        input.payment_status = Some(PaymentStatus::Pending);
        input.payment_method = PaymentMethod::Credit;
        let created = db.sales().create_sale(input, &user_id).await.unwrap();
        assert_eq!(created.points_earned, 0);
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 0);

        // Walk-in: no customer, no loyalty rows at all
        let created = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 1)]), &user_id)
            .await
            .unwrap();
        assert_eq!(created.points_earned, 0);
        let tx_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loyalty_transactions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tx_count, 0);
        assert!(created.sale.customer_id.is_none());
    }

    #[tokio::test]
    async fn test_redeem_points_in_sale() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 100).await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Bronze).await;

        // First sale banks 400 points (KSh 400 at 1.0x)
        let mut first = sale_input(&store_id, vec![pieces(&product.id, 10)]);
        first.customer_id = Some(customer_id.clone());
        db.sales().create_sale(first, &user_id).await.unwrap();
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 400);

        // Second sale redeems 200 of them: KSh 20.00 off the cash due
        let mut second = sale_input(&store_id, vec![pieces(&product.id, 1)]);
        second.customer_id = Some(customer_id.clone());
        second.redeem_points = Some(200);
        second.amount_paid = Some(2_000);
        let created = db.sales().create_sale(second, &user_id).await.unwrap();

        assert_eq!(created.loyalty_discount, 2_000);
        assert_eq!(created.sale.total_amount, 4_000);
        // 20.00 paid + 20.00 discount - 40.00 total = 0 change
        assert_eq!(created.sale.change_amount, 0);

        // Balance: 400 - 200 redeemed + 40 earned on the second sale
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 240);

        // Conservation across all movements
        let txs = db.loyalty().transactions(&customer_id).await.unwrap();
        let signed_sum: i64 = txs.iter().map(|t| t.points).sum();
        assert_eq!(signed_sum, 240);
    }

    #[tokio::test]
    async fn test_redeem_failure_rolls_back_stock() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Bronze).await;

        // No points banked; redemption must fail and take the stock
        // deduction down with it.
        let mut input = sale_input(&store_id, vec![pieces(&product.id, 2)]);
        input.customer_id = Some(customer_id.clone());
        input.redeem_points = Some(100);
        let err = db.sales().create_sale(input, &user_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientPoints { .. })
        ));

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 10);
        assert!(db
            .stock()
            .logs_for_product(&product.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_historical_sale_backdates_timestamp() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let back_then = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let mut input = sale_input(&store_id, vec![pieces(&product.id, 1)]);
        input.historical_date = Some(back_then);
        let created = db.sales().create_sale(input, &user_id).await.unwrap();

        assert_eq!(created.sale.created_at, back_then);

        // Stock logic is unaffected by backdating
        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 9);
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;
        db.products().deactivate(&product.id).await.unwrap();

        let err = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 1)]), &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductInactive { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_through_ledger() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let created = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 4)]), &user_id)
            .await
            .unwrap();

        let cancelled = db
            .sales()
            .cancel_sale(&created.sale.id, &user_id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 10);

        // Ledger explains both movements
        let logs = db.stock().logs_for_product(&product.id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].quantity_added, -4);
        assert_eq!(logs[1].quantity_added, 4);
        assert_eq!(logs[1].source, StockSource::Adjustment);

        // Terminal: cancelling again is rejected
        let err = db
            .sales()
            .cancel_sale(&created.sale.id, &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidSaleStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_with_items() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 10).await;

        let created = db
            .sales()
            .create_sale(sale_input(&store_id, vec![pieces(&product.id, 2)]), &user_id)
            .await
            .unwrap();

        let loaded = db
            .sales()
            .get_with_items(&created.sale.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].quantity, 2);
        assert_eq!(loaded.sale.total_amount, created.sale.total_amount);

        assert!(db.sales().get_with_items("missing").await.unwrap().is_none());
    }
}

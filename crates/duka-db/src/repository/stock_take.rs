//! # Stock-Take Repository
//!
//! Two-phase physical count reconciliation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  submit()                                                           │
//! │    └── snapshot system_quantity per product, variance computed,     │
//! │        session created `pending` — NO stock effect yet              │
//! │                                                                     │
//! │  apply()                      reject()                              │
//! │    └── every variance routed    └── reviewer + timestamp recorded,  │
//! │        through the ledger's         no stock effect                 │
//! │        conditional update                                           │
//! │                                                                     │
//! │  Both transitions happen exactly once; the session is terminal      │
//! │  afterwards and re-review is rejected.                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drift Policy
//! `system_quantity` is a snapshot; sales between submission and review
//! make it stale. Apply therefore re-validates against the LIVE quantity
//! by pushing each variance through the ledger's conditional update. If
//! any item's downward variance would drive live stock negative, the
//! entire apply fails and rolls back — the session stays `pending` for a
//! recount. No clamping: a clamped write would fabricate a count nobody
//! observed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use duka_core::{
    CoreError, StockSource, StockTakeItem, StockTakeSession, StockTakeStatus, UnitType,
};

use crate::error::{DbError, DbResult};
use crate::repository::product;
use crate::repository::stock::{self, StockAdjustment};

const SESSION_COLS: &str =
    "id, store_id, submitted_by, reviewed_by, status, notes, created_at, reviewed_at";

const ITEM_COLS: &str = "id, session_id, product_id, product_name, sku, category_name, \
     system_quantity, counted_quantity, variance, notes";

// =============================================================================
// Input / Output Types
// =============================================================================

/// One counted product in a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTakeItemInput {
    pub product_id: String,
    /// Physically counted quantity in base units.
    pub counted_quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for submitting a count session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitStockTake {
    pub store_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<StockTakeItemInput>,
}

/// A session with its counted items.
#[derive(Debug, Clone, Serialize)]
pub struct StockTakeWithItems {
    pub session: StockTakeSession,
    pub items: Vec<StockTakeItem>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock-take reconciliation.
#[derive(Debug, Clone)]
pub struct StockTakeRepository {
    pool: SqlitePool,
}

impl StockTakeRepository {
    /// Creates a new StockTakeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockTakeRepository { pool }
    }

    /// Submits a count session.
    ///
    /// Snapshots each product's live quantity as `system_quantity` and
    /// computes the variance immediately. Stock is not touched.
    pub async fn submit(
        &self,
        input: SubmitStockTake,
        actor_id: &str,
    ) -> DbResult<StockTakeWithItems> {
        if input.items.is_empty() {
            return Err(CoreError::from(duka_core::ValidationError::Required {
                field: "items".to_string(),
            })
            .into());
        }
        for item in &input.items {
            if item.counted_quantity < 0 {
                return Err(CoreError::from(duka_core::ValidationError::MustNotBeNegative {
                    field: "counted_quantity".to_string(),
                })
                .into());
            }
        }

        let mut tx = self.pool.begin().await?;

        let session = StockTakeSession {
            id: Uuid::new_v4().to_string(),
            store_id: input.store_id,
            submitted_by: actor_id.to_string(),
            reviewed_by: None,
            status: StockTakeStatus::Pending,
            notes: input.notes,
            created_at: Utc::now(),
            reviewed_at: None,
        };

        sqlx::query(
            "INSERT INTO stock_take_sessions (
                id, store_id, submitted_by, reviewed_by, status, notes, created_at, reviewed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&session.id)
        .bind(&session.store_id)
        .bind(&session.submitted_by)
        .bind(&session.reviewed_by)
        .bind(session.status)
        .bind(&session.notes)
        .bind(session.created_at)
        .bind(session.reviewed_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            let prod = product::get_tx(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| {
                    DbError::from(CoreError::ProductNotFound(line.product_id.clone()))
                })?;

            let category_name = match &prod.category_id {
                Some(category_id) => {
                    sqlx::query_scalar::<_, String>(
                        "SELECT name FROM categories WHERE id = ?1",
                    )
                    .bind(category_id)
                    .fetch_optional(&mut *tx)
                    .await?
                }
                None => None,
            };

            let item = StockTakeItem {
                id: Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                product_id: Some(prod.id.clone()),
                product_name: prod.name.clone(),
                sku: prod.sku.clone(),
                category_name,
                system_quantity: prod.quantity,
                counted_quantity: line.counted_quantity,
                variance: line.counted_quantity - prod.quantity,
                notes: line.notes,
            };

            sqlx::query(
                "INSERT INTO stock_take_items (
                    id, session_id, product_id, product_name, sku, category_name,
                    system_quantity, counted_quantity, variance, notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .bind(&item.id)
            .bind(&item.session_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.sku)
            .bind(&item.category_name)
            .bind(item.system_quantity)
            .bind(item.counted_quantity)
            .bind(item.variance)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            session_id = %session.id,
            items = items.len(),
            "Stock take submitted"
        );

        Ok(StockTakeWithItems { session, items })
    }

    /// Applies a pending session: every item's variance goes through the
    /// stock ledger, atomically across the whole session.
    ///
    /// Items whose product has since been removed are skipped (their
    /// snapshot rows remain for the record). If any adjustment would
    /// drive live stock negative the whole apply fails, the transaction
    /// rolls back, and the session stays `pending`.
    pub async fn apply(&self, session_id: &str, reviewer_id: &str) -> DbResult<StockTakeSession> {
        let mut tx = self.pool.begin().await?;

        let session = self.get_session_tx(&mut tx, session_id).await?;
        if session.status != StockTakeStatus::Pending {
            return Err(CoreError::StockTakeAlreadyReviewed {
                session_id: session_id.to_string(),
                status: session.status.as_str().to_string(),
            }
            .into());
        }

        let items = get_items_tx(&mut tx, session_id).await?;
        for item in &items {
            let Some(product_id) = &item.product_id else {
                debug!(sku = %item.sku, "Skipping stock-take item for removed product");
                continue;
            };

            // Zero variances are logged too: the ledger records that the
            // count confirmed the system quantity.
            stock::adjust(
                &mut tx,
                StockAdjustment {
                    product_id: product_id.clone(),
                    delta_base_units: item.variance,
                    unit_type: UnitType::Piece,
                    total_cost: 0,
                    source: StockSource::StockTake,
                    user_id: reviewer_id.to_string(),
                    notes: Some(format!("Stock take {session_id}")),
                },
            )
            .await?;
        }

        let reviewed = self
            .finish_review_tx(&mut tx, session_id, reviewer_id, StockTakeStatus::Applied)
            .await?;
        tx.commit().await?;

        info!(
            session_id = %session_id,
            items = items.len(),
            "Stock take applied"
        );

        Ok(reviewed)
    }

    /// Rejects a pending session. No stock effect.
    pub async fn reject(&self, session_id: &str, reviewer_id: &str) -> DbResult<StockTakeSession> {
        let mut tx = self.pool.begin().await?;

        let session = self.get_session_tx(&mut tx, session_id).await?;
        if session.status != StockTakeStatus::Pending {
            return Err(CoreError::StockTakeAlreadyReviewed {
                session_id: session_id.to_string(),
                status: session.status.as_str().to_string(),
            }
            .into());
        }

        let reviewed = self
            .finish_review_tx(&mut tx, session_id, reviewer_id, StockTakeStatus::Rejected)
            .await?;
        tx.commit().await?;

        info!(session_id = %session_id, "Stock take rejected");

        Ok(reviewed)
    }

    /// Gets a session with its items.
    pub async fn get_with_items(&self, session_id: &str) -> DbResult<Option<StockTakeWithItems>> {
        let session = sqlx::query_as::<_, StockTakeSession>(&format!(
            "SELECT {SESSION_COLS} FROM stock_take_sessions WHERE id = ?1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, StockTakeItem>(&format!(
            "SELECT {ITEM_COLS} FROM stock_take_items WHERE session_id = ?1 ORDER BY sku"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StockTakeWithItems { session, items }))
    }

    async fn get_session_tx(
        &self,
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> DbResult<StockTakeSession> {
        let session = sqlx::query_as::<_, StockTakeSession>(&format!(
            "SELECT {SESSION_COLS} FROM stock_take_sessions WHERE id = ?1"
        ))
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;

        session.ok_or_else(|| CoreError::StockTakeNotFound(session_id.to_string()).into())
    }

    /// Records the terminal transition. The status guard in the WHERE
    /// clause makes the transition exactly-once even under concurrent
    /// reviewers: the loser affects zero rows.
    async fn finish_review_tx(
        &self,
        conn: &mut SqliteConnection,
        session_id: &str,
        reviewer_id: &str,
        status: StockTakeStatus,
    ) -> DbResult<StockTakeSession> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE stock_take_sessions
             SET status = ?2, reviewed_by = ?3, reviewed_at = ?4
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(session_id)
        .bind(status)
        .bind(reviewer_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StockTakeAlreadyReviewed {
                session_id: session_id.to_string(),
                status: "reviewed".to_string(),
            }
            .into());
        }

        self.get_session_tx(conn, session_id).await
    }
}

/// Fetches the items of a stock-take session on an open transaction.
async fn get_items_tx(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<StockTakeItem>> {
    let items = sqlx::query_as::<_, StockTakeItem>(&format!(
        "SELECT {ITEM_COLS} FROM stock_take_items WHERE session_id = ?1 ORDER BY sku"
    ))
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use duka_core::{CoreError, PaymentMethod, StockSource, StockTakeStatus, UnitType};

    use super::{StockTakeItemInput, SubmitStockTake};
    use crate::repository::sale::{CreateSale, SaleItemInput};
    use crate::repository::testing::{seed_base, seed_product, test_db};
    use crate::DbError;

    fn submission(store_id: &str, items: Vec<StockTakeItemInput>) -> SubmitStockTake {
        SubmitStockTake {
            store_id: store_id.to_string(),
            notes: None,
            items,
        }
    }

    fn count(product_id: &str, counted_quantity: i64) -> StockTakeItemInput {
        StockTakeItemInput {
            product_id: product_id.to_string(),
            counted_quantity,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_submit_snapshots_without_stock_effect() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 50).await;

        let submitted = db
            .stock_takes()
            .submit(submission(&store_id, vec![count(&product.id, 45)]), &user_id)
            .await
            .unwrap();

        assert_eq!(submitted.session.status, StockTakeStatus::Pending);
        assert_eq!(submitted.items[0].system_quantity, 50);
        assert_eq!(submitted.items[0].counted_quantity, 45);
        assert_eq!(submitted.items[0].variance, -5);
        assert_eq!(submitted.items[0].sku, "SODA-300");

        // Submission alone touches neither quantity nor the ledger
        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 50);
        assert!(db
            .stock()
            .logs_for_product(&product.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_apply_writes_variance_through_ledger() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let short = seed_product(&db, "SODA-300", 50).await;
        let exact = seed_product(&db, "BREAD-400", 20).await;

        let submitted = db
            .stock_takes()
            .submit(
                submission(
                    &store_id,
                    vec![count(&short.id, 45), count(&exact.id, 20)],
                ),
                &user_id,
            )
            .await
            .unwrap();

        let applied = db
            .stock_takes()
            .apply(&submitted.session.id, &user_id)
            .await
            .unwrap();
        assert_eq!(applied.status, StockTakeStatus::Applied);
        assert_eq!(applied.reviewed_by.as_deref(), Some(user_id.as_str()));
        assert!(applied.reviewed_at.is_some());

        let live = db.products().get_by_id(&short.id).await.unwrap().unwrap();
        assert_eq!(live.quantity, 45);

        let logs = db.stock().logs_for_product(&short.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].quantity_added, -5);
        assert_eq!(logs[0].source, StockSource::StockTake);

        // Zero variance still produces an audit entry
        let logs = db.stock().logs_for_product(&exact.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].quantity_added, 0);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_re_review() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 50).await;

        let submitted = db
            .stock_takes()
            .submit(submission(&store_id, vec![count(&product.id, 48)]), &user_id)
            .await
            .unwrap();
        db.stock_takes()
            .apply(&submitted.session.id, &user_id)
            .await
            .unwrap();

        // Variance must not be applied twice
        let err = db
            .stock_takes()
            .apply(&submitted.session.id, &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::StockTakeAlreadyReviewed { .. })
        ));
        let err = db
            .stock_takes()
            .reject(&submitted.session.id, &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::StockTakeAlreadyReviewed { .. })
        ));

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 48);
    }

    #[tokio::test]
    async fn test_reject_has_no_stock_effect() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 50).await;

        let submitted = db
            .stock_takes()
            .submit(submission(&store_id, vec![count(&product.id, 10)]), &user_id)
            .await
            .unwrap();
        let rejected = db
            .stock_takes()
            .reject(&submitted.session.id, &user_id)
            .await
            .unwrap();
        assert_eq!(rejected.status, StockTakeStatus::Rejected);

        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 50);
        assert!(db
            .stock()
            .logs_for_product(&product.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_apply_fails_when_concurrent_sales_drifted_below_snapshot() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 50).await;

        // Count observes 45 against system 50 (variance -5)
        let submitted = db
            .stock_takes()
            .submit(submission(&store_id, vec![count(&product.id, 45)]), &user_id)
            .await
            .unwrap();

        // Between submission and review, sales take live stock to 3
        db.sales()
            .create_sale(
                CreateSale {
                    items: vec![SaleItemInput {
                        product_id: product.id.clone(),
                        quantity: 47,
                        unit_type: UnitType::Piece,
                        unit_price: Some(4_000),
                    }],
                    payment_method: PaymentMethod::Cash,
                    store_id: store_id.clone(),
                    status: None,
                    payment_status: None,
                    amount_paid: None,
                    customer_id: None,
                    delivery_fee: 0,
                    total: None,
                    redeem_points: None,
                    historical_date: None,
                },
                &user_id,
            )
            .await
            .unwrap();

        // Applying -5 against live 3 would go negative: the whole apply
        // fails and the session stays pending for a recount.
        let err = db
            .stock_takes()
            .apply(&submitted.session.id, &user_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        let session = db
            .stock_takes()
            .get_with_items(&submitted.session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.session.status, StockTakeStatus::Pending);

        // Live stock untouched by the failed apply; only the sale's
        // ledger entry exists.
        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 3);
        let logs = db.stock().logs_for_product(&product.id).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_recheck_uses_live_quantity_not_snapshot() {
        let db = test_db().await;
        let (store_id, user_id) = seed_base(&db).await;
        let product = seed_product(&db, "SODA-300", 50).await;

        let submitted = db
            .stock_takes()
            .submit(submission(&store_id, vec![count(&product.id, 45)]), &user_id)
            .await
            .unwrap();

        // A concurrent sale reduces live quantity to 40
        db.sales()
            .create_sale(
                CreateSale {
                    items: vec![SaleItemInput {
                        product_id: product.id.clone(),
                        quantity: 10,
                        unit_type: UnitType::Piece,
                        unit_price: Some(4_000),
                    }],
                    payment_method: PaymentMethod::Cash,
                    store_id: store_id.clone(),
                    status: None,
                    payment_status: None,
                    amount_paid: None,
                    customer_id: None,
                    delivery_fee: 0,
                    total: None,
                    redeem_points: None,
                    historical_date: None,
                },
                &user_id,
            )
            .await
            .unwrap();

        db.stock_takes()
            .apply(&submitted.session.id, &user_id)
            .await
            .unwrap();

        // The variance (-5) lands on the LIVE quantity: 40 → 35, not a
        // blind write of the counted 45.
        let live = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.quantity, 35);
    }
}

//! # Loyalty Repository
//!
//! Persistence half of the loyalty engine. The earn/redeem entry points
//! are transaction-scoped on purpose: they never commit independently,
//! so loyalty movements live or die with the sale that caused them.
//!
//! ## Conservation Invariant
//! `loyalty_points.points` for a customer always equals the signed sum
//! of their `loyalty_transactions.points`. Both writes happen here, in
//! the same transaction, and transaction rows are append-only.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use duka_core::{
    CoreError, LoyaltyPolicy, LoyaltyTier, LoyaltyTransaction, LoyaltyTxKind, Money,
};

use crate::error::DbResult;

const LOYALTY_TX_COLS: &str = "id, customer_id, sale_id, points, kind, created_at";

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Accrues points for a paid sale, inside the caller's transaction.
///
/// Returns the points earned (possibly zero, in which case nothing is
/// written — a zero-point accrual is not a movement).
pub(crate) async fn earn_tx(
    conn: &mut SqliteConnection,
    policy: &LoyaltyPolicy,
    customer_id: &str,
    sale_id: &str,
    subtotal: Money,
    tier: LoyaltyTier,
) -> DbResult<i64> {
    let points = policy.earned_points(subtotal, tier);
    if points == 0 {
        return Ok(0);
    }

    let now = Utc::now();

    sqlx::query(
        "INSERT INTO loyalty_points (customer_id, points, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(customer_id)
         DO UPDATE SET points = points + excluded.points, updated_at = excluded.updated_at",
    )
    .bind(customer_id)
    .bind(points)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    insert_transaction(
        conn,
        customer_id,
        Some(sale_id),
        points,
        LoyaltyTxKind::Earn,
    )
    .await?;

    debug!(customer_id = %customer_id, points, "Loyalty points earned");
    Ok(points)
}

/// Redeems points against the customer's balance, inside the caller's
/// transaction. Returns the discount the redeemed points are worth.
///
/// The balance update is conditional (`points >= :redeemed`) so two
/// concurrent redemptions cannot both spend the same points: the loser
/// affects zero rows and fails with `InsufficientPoints`.
pub(crate) async fn redeem_tx(
    conn: &mut SqliteConnection,
    policy: &LoyaltyPolicy,
    customer_id: &str,
    sale_id: &str,
    points: i64,
) -> DbResult<Money> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT points FROM loyalty_points WHERE customer_id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await?;
    let balance = balance.unwrap_or(0);

    policy.validate_redeem(points, balance)?;

    let result = sqlx::query(
        "UPDATE loyalty_points SET points = points - ?2, updated_at = ?3
         WHERE customer_id = ?1 AND points >= ?2",
    )
    .bind(customer_id)
    .bind(points)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::InsufficientPoints {
            available: balance,
            requested: points,
        }
        .into());
    }

    insert_transaction(
        conn,
        customer_id,
        Some(sale_id),
        -points,
        LoyaltyTxKind::Redeem,
    )
    .await?;

    debug!(customer_id = %customer_id, points, "Loyalty points redeemed");
    Ok(policy.redeem_discount(points))
}

async fn insert_transaction(
    conn: &mut SqliteConnection,
    customer_id: &str,
    sale_id: Option<&str>,
    points: i64,
    kind: LoyaltyTxKind,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO loyalty_transactions (id, customer_id, sale_id, points, kind, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(customer_id)
    .bind(sale_id)
    .bind(points)
    .bind(kind)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for loyalty balance and history queries.
#[derive(Debug, Clone)]
pub struct LoyaltyRepository {
    pool: SqlitePool,
    policy: LoyaltyPolicy,
}

impl LoyaltyRepository {
    /// Creates a new LoyaltyRepository.
    pub fn new(pool: SqlitePool, policy: LoyaltyPolicy) -> Self {
        LoyaltyRepository { pool, policy }
    }

    /// The active loyalty policy.
    pub fn policy(&self) -> LoyaltyPolicy {
        self.policy
    }

    /// Current point balance for a customer (zero if never accrued).
    pub async fn balance(&self, customer_id: &str) -> DbResult<i64> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT points FROM loyalty_points WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance.unwrap_or(0))
    }

    /// A customer's loyalty movements, oldest first.
    pub async fn transactions(&self, customer_id: &str) -> DbResult<Vec<LoyaltyTransaction>> {
        let txs = sqlx::query_as::<_, LoyaltyTransaction>(&format!(
            "SELECT {LOYALTY_TX_COLS} FROM loyalty_transactions
             WHERE customer_id = ?1 ORDER BY created_at, id"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(txs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use duka_core::{LoyaltyTier, Money};

    use crate::repository::testing::{seed_customer, test_db};
    use crate::DbError;

    #[tokio::test]
    async fn test_earn_and_balance() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Gold).await;
        let policy = db.loyalty_policy();

        let mut tx = db.pool().begin().await.unwrap();
        let points = super::earn_tx(
            &mut tx,
            &policy,
            &customer_id,
            "sale-1",
            Money::from_cents(50_000), // KSh 500 at 2.0x = 1000 points
            LoyaltyTier::Gold,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(points, 1_000);
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_redeem_updates_balance_and_history() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Bronze).await;
        let policy = db.loyalty_policy();

        let mut tx = db.pool().begin().await.unwrap();
        super::earn_tx(
            &mut tx,
            &policy,
            &customer_id,
            "sale-1",
            Money::from_cents(50_000),
            LoyaltyTier::Bronze,
        )
        .await
        .unwrap();
        let discount = super::redeem_tx(&mut tx, &policy, &customer_id, "sale-2", 200)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // 200 points at 10 points per unit = KSh 20.00
        assert_eq!(discount.cents(), 2_000);
        assert_eq!(db.loyalty().balance(&customer_id).await.unwrap(), 300);

        // Conservation: balance equals the signed transaction sum
        let txs = db.loyalty().transactions(&customer_id).await.unwrap();
        let signed_sum: i64 = txs.iter().map(|t| t.points).sum();
        assert_eq!(signed_sum, 300);
        assert_eq!(txs.len(), 2);
    }

    #[tokio::test]
    async fn test_redeem_rejects_overdraft_and_off_increment() {
        let db = test_db().await;
        let customer_id = seed_customer(&db, "Wanjiku", LoyaltyTier::Bronze).await;
        let policy = db.loyalty_policy();

        let mut tx = db.pool().begin().await.unwrap();
        super::earn_tx(
            &mut tx,
            &policy,
            &customer_id,
            "sale-1",
            Money::from_cents(15_000), // 150 points
            LoyaltyTier::Bronze,
        )
        .await
        .unwrap();

        // More than balance
        let err = super::redeem_tx(&mut tx, &policy, &customer_id, "sale-2", 200)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(duka_core::CoreError::InsufficientPoints { .. })
        ));

        // Off the 100-point increment
        let err = super::redeem_tx(&mut tx, &policy, &customer_id, "sale-2", 150)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(duka_core::CoreError::InvalidRedeemAmount { .. })
        ));
    }
}

//! # Customer Repository
//!
//! Customer directory operations. Walk-in sales carry no customer row at
//! all (`sales.customer_id IS NULL`), so nothing here is required for
//! the anonymous checkout path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use duka_core::validation::validate_name;
use duka_core::{CoreError, Customer, LoyaltyTier};

use crate::error::DbResult;

const CUSTOMER_COLS: &str = "id, name, phone, tier, is_active, created_at";

/// Input for creating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tier: LoyaltyTier,
}

/// Repository for customer directory operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer.
    pub async fn create(&self, input: NewCustomer) -> DbResult<Customer> {
        validate_name("name", &input.name).map_err(CoreError::from)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone,
            tier: input.tier,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, name = %customer.name, "Creating customer");

        sqlx::query(
            "INSERT INTO customers (id, name, phone, tier, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.tier)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use duka_core::LoyaltyTier;

    use crate::repository::testing::{seed_customer, test_db};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let id = seed_customer(&db, "Wanjiku", LoyaltyTier::Silver).await;

        let customer = db.customers().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(customer.name, "Wanjiku");
        assert_eq!(customer.tier, LoyaltyTier::Silver);
    }

    #[tokio::test]
    async fn test_missing_customer() {
        let db = test_db().await;
        assert!(db.customers().get_by_id("nope").await.unwrap().is_none());
    }
}

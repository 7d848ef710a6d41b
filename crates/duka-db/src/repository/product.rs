//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## Quantity Discipline
//! This repository never writes `quantity` after creation. The seed
//! quantity supplied at creation time is the only out-of-band value; all
//! later changes flow through the stock ledger so the movement log
//! explains every delta.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use duka_core::validation::{validate_amount_cents, validate_name, validate_sku};
use duka_core::{Product, UnitType};

use crate::error::{DbError, DbResult};

/// Column list shared by the product queries in this crate.
pub(crate) const PRODUCT_COLS: &str = "id, name, sku, category_id, stock_unit, quantity, \
     min_quantity, pack_size, piece_buying_price, pack_buying_price, dozen_buying_price, \
     piece_selling_price, pack_selling_price, dozen_selling_price, is_active, \
     created_at, updated_at";

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Seed quantity in base units (pre-system stock on hand).
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    /// Base units per pack. Defaults to 3.
    #[serde(default = "default_pack_size")]
    pub pack_size: i64,
    #[serde(default)]
    pub piece_buying_price: i64,
    #[serde(default)]
    pub pack_buying_price: i64,
    #[serde(default)]
    pub dozen_buying_price: i64,
    #[serde(default)]
    pub piece_selling_price: i64,
    #[serde(default)]
    pub pack_selling_price: i64,
    #[serde(default)]
    pub dozen_selling_price: i64,
}

fn default_pack_size() -> i64 {
    3
}

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        validate_name("name", &input.name).map_err(duka_core::CoreError::from)?;
        validate_sku(&input.sku).map_err(duka_core::CoreError::from)?;
        for (field, cents) in [
            ("piece_buying_price", input.piece_buying_price),
            ("pack_buying_price", input.pack_buying_price),
            ("dozen_buying_price", input.dozen_buying_price),
            ("piece_selling_price", input.piece_selling_price),
            ("pack_selling_price", input.pack_selling_price),
            ("dozen_selling_price", input.dozen_selling_price),
        ] {
            validate_amount_cents(field, cents).map_err(duka_core::CoreError::from)?;
        }
        if input.quantity < 0 || input.min_quantity < 0 || input.pack_size <= 0 {
            return Err(duka_core::CoreError::from(
                duka_core::ValidationError::MustBePositive {
                    field: "quantity/pack_size".to_string(),
                },
            )
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            sku: input.sku.trim().to_string(),
            category_id: input.category_id,
            stock_unit: "piece".to_string(),
            quantity: input.quantity,
            min_quantity: input.min_quantity,
            pack_size: input.pack_size,
            piece_buying_price: input.piece_buying_price,
            pack_buying_price: input.pack_buying_price,
            dozen_buying_price: input.dozen_buying_price,
            piece_selling_price: input.piece_selling_price,
            pack_selling_price: input.pack_selling_price,
            dozen_selling_price: input.dozen_selling_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Creating product");

        sqlx::query(
            "INSERT INTO products (
                id, name, sku, category_id, stock_unit, quantity, min_quantity, pack_size,
                piece_buying_price, pack_buying_price, dozen_buying_price,
                piece_selling_price, pack_selling_price, dozen_selling_price,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category_id)
        .bind(&product.stock_unit)
        .bind(product.quantity)
        .bind(product.min_quantity)
        .bind(product.pack_size)
        .bind(product.piece_buying_price)
        .bind(product.pack_buying_price)
        .bind(product.dozen_buying_price)
        .bind(product.piece_selling_price)
        .bind(product.pack_selling_price)
        .bind(product.dozen_selling_price)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Soft-deactivates a product.
    ///
    /// Products referenced by sales are never hard-deleted; deactivation
    /// removes them from sale paths while history stays intact.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Product deactivated");
        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Loads a product inside the caller's transaction.
pub(crate) async fn get_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Updates the per-unit buying/selling price for one denomination, inside
/// the caller's transaction. Used by stock receiving to record the latest
/// purchase cost.
pub(crate) async fn update_unit_prices_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
    unit_type: UnitType,
    buying_price: i64,
    selling_price: i64,
) -> DbResult<()> {
    let (buying_col, selling_col) = match unit_type {
        UnitType::Piece => ("piece_buying_price", "piece_selling_price"),
        UnitType::Pack => ("pack_buying_price", "pack_selling_price"),
        UnitType::Dozen => ("dozen_buying_price", "dozen_selling_price"),
    };

    let result = sqlx::query(&format!(
        "UPDATE products SET {buying_col} = ?2, {selling_col} = ?3, updated_at = ?4 WHERE id = ?1"
    ))
    .bind(product_id)
    .bind(buying_price)
    .bind(selling_price)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::repository::testing::{seed_product, test_db};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let product = seed_product(&db, "SODA-300", 24).await;

        let loaded = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.sku, "SODA-300");
        assert_eq!(loaded.quantity, 24);
        assert_eq!(loaded.pack_size, 3);
        assert!(loaded.is_active);

        let by_sku = db.products().get_by_sku("SODA-300").await.unwrap();
        assert!(by_sku.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        seed_product(&db, "SODA-300", 10).await;

        let err = db
            .products()
            .create(crate::repository::product::NewProduct {
                name: "Duplicate".to_string(),
                sku: "SODA-300".to_string(),
                category_id: None,
                quantity: 0,
                min_quantity: 0,
                pack_size: 3,
                piece_buying_price: 100,
                pack_buying_price: 0,
                dozen_buying_price: 0,
                piece_selling_price: 150,
                pack_selling_price: 0,
                dozen_selling_price: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, crate::DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = test_db().await;
        let product = seed_product(&db, "SODA-300", 10).await;

        db.products().deactivate(&product.id).await.unwrap();
        let loaded = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!loaded.is_active);

        // Second deactivation is a not-found (already inactive)
        assert!(db.products().deactivate(&product.id).await.is_err());
    }
}

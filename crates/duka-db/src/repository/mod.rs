//! # Repository Implementations
//!
//! One repository per aggregate. Repositories are cheap handles over the
//! shared pool; transactional orchestration (sales, stock-take apply)
//! lives in the repository that owns the aggregate and reaches into
//! sibling modules through `pub(crate)` transaction-scoped functions so
//! everything commits or rolls back together.

pub mod customer;
pub mod expense;
pub mod loyalty;
pub mod product;
pub mod sale;
pub mod stock;
pub mod stock_take;
pub mod store;
pub mod user;

// =============================================================================
// Shared Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory database fixtures shared by repository tests.

    use duka_core::{LoyaltyTier, Product};

    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;

    /// Fresh in-memory database with migrations applied.
    pub(crate) async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Seeds one store and one user; returns (store_id, user_id).
    pub(crate) async fn seed_base(db: &Database) -> (String, String) {
        let store = db.stores().create("Main Street Duka").await.unwrap();
        let user = db.users().create("Amina").await.unwrap();
        (store.id, user.id)
    }

    /// Seeds a fully-priced product with the given SKU and seed quantity.
    ///
    /// pack_size = 3; piece buys at 30.00 and sells at 40.00, pack at
    /// 85.00 / 110.00, dozen at 330.00 / 420.00.
    pub(crate) async fn seed_product(db: &Database, sku: &str, quantity: i64) -> Product {
        db.products()
            .create(NewProduct {
                name: format!("Product {sku}"),
                sku: sku.to_string(),
                category_id: None,
                quantity,
                min_quantity: 2,
                pack_size: 3,
                piece_buying_price: 3_000,
                pack_buying_price: 8_500,
                dozen_buying_price: 33_000,
                piece_selling_price: 4_000,
                pack_selling_price: 11_000,
                dozen_selling_price: 42_000,
            })
            .await
            .unwrap()
    }

    /// Seeds a customer at the given loyalty tier.
    pub(crate) async fn seed_customer(db: &Database, name: &str, tier: LoyaltyTier) -> String {
        db.customers()
            .create(crate::repository::customer::NewCustomer {
                name: name.to_string(),
                phone: None,
                tier,
            })
            .await
            .unwrap()
            .id
    }
}

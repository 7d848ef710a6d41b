//! # Store Repository
//!
//! Stores are the tenant boundary: sales, expenses and stock-take
//! sessions all reference one.

use sqlx::SqlitePool;
use uuid::Uuid;

use duka_core::validation::validate_name;
use duka_core::{CoreError, Store};

use crate::error::DbResult;

/// Repository for store records.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Creates a store.
    pub async fn create(&self, name: &str) -> DbResult<Store> {
        validate_name("name", name).map_err(CoreError::from)?;

        let store = Store {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO stores (id, name) VALUES (?1, ?2)")
            .bind(&store.id)
            .bind(&store.name)
            .execute(&self.pool)
            .await?;

        Ok(store)
    }

    /// Gets a store by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>("SELECT id, name FROM stores WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(store)
    }
}

//! # User Repository
//!
//! Staff directory. The API layer resolves the acting user through
//! [`UserRepository::get_active`] before any mutating operation runs;
//! authentication mechanics themselves live outside this system.

use sqlx::SqlitePool;
use uuid::Uuid;

use duka_core::validation::validate_name;
use duka_core::{CoreError, User};

use crate::error::DbResult;

/// Repository for staff user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an active user.
    pub async fn create(&self, name: &str) -> DbResult<User> {
        validate_name("name", name).map_err(CoreError::from)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            is_active: true,
        };

        sqlx::query("INSERT INTO users (id, name, is_active) VALUES (?1, ?2, ?3)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(user.is_active)
            .execute(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, name, is_active FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Gets a user by ID only if active. Used for actor resolution.
    pub async fn get_active(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, is_active FROM users WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

//! # Expense Repository
//!
//! Business expenses. The sale orchestrator auto-creates one expense per
//! delivery fee, inside the sale's transaction, via [`insert_tx`].

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use duka_core::{Expense, PaymentMethod};

use crate::error::DbResult;

const EXPENSE_COLS: &str =
    "id, description, amount, category, payment_method, user_id, store_id, expense_date, created_at";

/// Input for inserting an expense.
#[derive(Debug, Clone)]
pub(crate) struct NewExpense {
    pub description: String,
    pub amount: i64,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub user_id: String,
    pub store_id: String,
    pub expense_date: DateTime<Utc>,
}

/// Inserts an expense inside the caller's transaction.
pub(crate) async fn insert_tx(
    conn: &mut SqliteConnection,
    input: NewExpense,
) -> DbResult<Expense> {
    let expense = Expense {
        id: Uuid::new_v4().to_string(),
        description: input.description,
        amount: input.amount,
        category: input.category,
        payment_method: input.payment_method,
        user_id: input.user_id,
        store_id: input.store_id,
        expense_date: input.expense_date,
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO expenses (
            id, description, amount, category, payment_method,
            user_id, store_id, expense_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&expense.id)
    .bind(&expense.description)
    .bind(expense.amount)
    .bind(&expense.category)
    .bind(expense.payment_method)
    .bind(&expense.user_id)
    .bind(&expense.store_id)
    .bind(expense.expense_date)
    .bind(expense.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(expense)
}

/// Repository for expense queries.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Gets an expense by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLS} FROM expenses WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Lists a store's expenses, most recent first.
    pub async fn list_for_store(&self, store_id: &str, limit: u32) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLS} FROM expenses WHERE store_id = ?1
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

//! Customer directory and loyalty endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use duka_core::{Customer, LoyaltyTransaction};
use duka_db::NewCustomer;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// A customer's loyalty standing.
#[derive(Debug, Serialize)]
pub struct LoyaltyStatement {
    pub customer_id: String,
    pub balance: i64,
    pub transactions: Vec<LoyaltyTransaction>,
}

/// `POST /customers` — creates a customer.
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    debug!(user_id = %actor.user_id, name = %input.name, "create customer");

    let customer = state.db.customers().create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `GET /customers/{id}/loyalty` — balance plus full movement history.
pub async fn loyalty(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LoyaltyStatement>, ApiError> {
    state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", &id))?;

    let balance = state.db.loyalty().balance(&id).await?;
    let transactions = state.db.loyalty().transactions(&id).await?;

    Ok(Json(LoyaltyStatement {
        customer_id: id,
        balance,
        transactions,
    }))
}

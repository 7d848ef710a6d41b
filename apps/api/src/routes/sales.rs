//! Sale endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use duka_core::Sale;
use duka_db::{CreateSale, CreatedSale, SaleWithItems};

use crate::auth::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /sales` — the create-sale contract.
///
/// The orchestrator runs the whole sale in one transaction; any failure
/// leaves no sale, no items, no stock deduction, no loyalty movement and
/// no expense behind.
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<CreateSale>,
) -> Result<(StatusCode, Json<CreatedSale>), ApiError> {
    debug!(user_id = %actor.user_id, items = input.items.len(), "create sale");

    let created = state.db.sales().create_sale(input, &actor.user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /sales/{id}` — a sale with its line items.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SaleWithItems>, ApiError> {
    let sale = state
        .db
        .sales()
        .get_with_items(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;

    Ok(Json(sale))
}

/// `POST /sales/{id}/cancel` — reverses the sale's stock deduction
/// through the ledger and marks it cancelled.
pub async fn cancel(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    debug!(user_id = %actor.user_id, sale_id = %id, "cancel sale");

    let sale = state.db.sales().cancel_sale(&id, &actor.user_id).await?;
    Ok(Json(sale))
}

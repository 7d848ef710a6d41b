//! Stock movement endpoints.

use axum::extract::{Path, State};
use axum::Json;
use tracing::debug;

use duka_core::{Product, StockLogEntry};
use duka_db::ReceiveStock;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /stock/receive` — receives stock for a product.
///
/// The received quantity is converted to base units via the unit pricing
/// resolver, the product's per-unit prices are refreshed, and the ledger
/// is adjusted — all in one transaction.
pub async fn receive(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<ReceiveStock>,
) -> Result<Json<Product>, ApiError> {
    debug!(
        user_id = %actor.user_id,
        product_id = %input.product_id,
        quantity = input.quantity,
        "receive stock"
    );

    let product = state.db.stock().receive(input, &actor.user_id).await?;
    Ok(Json(product))
}

/// `GET /products/{id}/stock-logs` — the product's movement ledger,
/// oldest first.
pub async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StockLogEntry>>, ApiError> {
    state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    let logs = state.db.stock().logs_for_product(&id).await?;
    Ok(Json(logs))
}

//! Stock-take reconciliation endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use duka_core::StockTakeSession;
use duka_db::{StockTakeWithItems, SubmitStockTake};

use crate::auth::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /stock-takes` — submits a count session (snapshot, no stock
/// effect).
pub async fn submit(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<SubmitStockTake>,
) -> Result<(StatusCode, Json<StockTakeWithItems>), ApiError> {
    debug!(user_id = %actor.user_id, items = input.items.len(), "submit stock take");

    let session = state.db.stock_takes().submit(input, &actor.user_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /stock-takes/{id}` — a session with its counted items.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StockTakeWithItems>, ApiError> {
    let session = state
        .db
        .stock_takes()
        .get_with_items(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Stock take session", &id))?;

    Ok(Json(session))
}

/// `POST /stock-takes/{id}/apply` — writes every variance into the
/// ledger, atomically across the session. Terminal.
pub async fn apply(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<StockTakeSession>, ApiError> {
    debug!(user_id = %actor.user_id, session_id = %id, "apply stock take");

    let session = state.db.stock_takes().apply(&id, &actor.user_id).await?;
    Ok(Json(session))
}

/// `POST /stock-takes/{id}/reject` — records the review with no stock
/// effect. Terminal.
pub async fn reject(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<StockTakeSession>, ApiError> {
    debug!(user_id = %actor.user_id, session_id = %id, "reject stock take");

    let session = state.db.stock_takes().reject(&id, &actor.user_id).await?;
    Ok(Json(session))
}

//! Product catalog endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use duka_core::Product;
use duka_db::NewProduct;

use crate::auth::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /products` — creates a catalog product.
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    debug!(user_id = %actor.user_id, sku = %input.sku, "create product");

    let product = state.db.products().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/{id}`.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(product))
}

/// `GET /products` — active products.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.db.products().list_active(200).await?;
    Ok(Json(products))
}

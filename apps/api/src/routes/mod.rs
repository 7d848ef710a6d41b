//! # HTTP Routes
//!
//! Route table for the Duka POS API. Handlers are thin: extract the
//! actor, deserialize a typed body, call the repository, classify the
//! error.

pub mod customers;
pub mod products;
pub mod sales;
pub mod stock;
pub mod stock_takes;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// Builds the fully-materialised API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Sales
        .route("/sales", post(sales::create))
        .route("/sales/{id}", get(sales::get_one))
        .route("/sales/{id}/cancel", post(sales::cancel))
        // Stock
        .route("/stock/receive", post(stock::receive))
        .route("/products/{id}/stock-logs", get(stock::logs))
        // Stock takes
        .route("/stock-takes", post(stock_takes::submit))
        .route("/stock-takes/{id}", get(stock_takes::get_one))
        .route("/stock-takes/{id}/apply", post(stock_takes::apply))
        .route("/stock-takes/{id}/reject", post(stock_takes::reject))
        // Catalog
        .route("/products", post(products::create).get(products::list))
        .route("/products/{id}", get(products::get_one))
        // Customers
        .route("/customers", post(customers::create))
        .route("/customers/{id}/loyalty", get(customers::loyalty))
        // Health
        .route("/health", get(health))
        .with_state(state)
}

/// Liveness/readiness probe.
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let healthy = state.db.health_check().await;
    Json(json!({ "status": if healthy { "ok" } else { "degraded" } }))
}

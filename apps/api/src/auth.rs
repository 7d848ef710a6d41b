//! # Actor Resolution
//!
//! Every mutating route requires an acting staff member, resolved from
//! the `x-user-id` header against the active user directory. Requests
//! without one are rejected 401 before any domain logic — and before any
//! transaction — runs.
//!
//! Authentication *mechanics* (sessions, tokens, passwords) are handled
//! by the fronting gateway and are out of scope here; this extractor
//! only attaches an already-authenticated identity to the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The acting staff member for a request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthenticated("Missing x-user-id header"))?;

        let user = state
            .db
            .users()
            .get_active(user_id)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::unauthenticated("Unknown or inactive user"))?;

        Ok(Actor { user_id: user.id })
    }
}

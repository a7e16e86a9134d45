// handlers/public/auth/refresh.rs - POST /api/auth/refresh handler

use axum::extract::State;
use serde::Deserialize;

use crate::auth::{TokenError, TokenPair};
use crate::error::ApiError;
use crate::handlers::extract::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Trade a refresh token for a fresh pair. The account is re-checked so a
/// deactivated operator cannot keep a session alive.
pub async fn refresh_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> ApiResult<TokenPair> {
    let claims = state.tokens.decode_refresh(&body.refresh_token).map_err(|err| match err {
        TokenError::WrongType => ApiError::unauthorized("Invalid token type"),
        _ => ApiError::unauthorized("Invalid or expired refresh token"),
    })?;

    let user = match claims.user_id() {
        Some(id) => state.store.get_user(id).await?,
        None => None,
    };
    let user = user
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found or inactive"))?;

    let tokens = state.tokens.issue_pair(&user.id.to_string())?;
    Ok(ApiResponse::success(tokens))
}

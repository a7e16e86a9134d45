// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{dummy_verify, verify_password, TokenPair};
use crate::error::ApiError;
use crate::handlers::extract::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

const LOGIN_FAILED: &str = "Invalid username or password";

/// Exchange operator credentials for an access/refresh token pair.
///
/// Unknown usernames, wrong passwords and inactive accounts all produce
/// the same 401 so the response never reveals which one it was.
pub async fn login_post(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<LoginRequest>,
) -> ApiResult<TokenPair> {
    let Some(user) = state.store.get_user_by_username(&credentials.username).await? else {
        dummy_verify(&credentials.password, &state.dummy_hash);
        tracing::warn!("Login failed for unknown user '{}'", credentials.username);
        return Err(ApiError::unauthorized(LOGIN_FAILED));
    };

    if !verify_password(&credentials.password, &user.password_hash) {
        tracing::warn!("Login failed for '{}': wrong password", user.username);
        return Err(ApiError::unauthorized(LOGIN_FAILED));
    }

    if !user.is_active {
        tracing::warn!("Login refused for inactive user '{}'", user.username);
        return Err(ApiError::unauthorized(LOGIN_FAILED));
    }

    state.store.record_login(user.id, Utc::now()).await?;
    let tokens = state.tokens.issue_pair(&user.id.to_string())?;

    tracing::info!("User '{}' logged in", user.username);
    Ok(ApiResponse::success(tokens))
}

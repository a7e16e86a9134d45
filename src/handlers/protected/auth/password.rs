// handlers/protected/auth/password.rs - PUT /api/auth/password handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::handlers::{extract::JsonBody, validate};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    JsonBody(body): JsonBody<PasswordChange>,
) -> ApiResult<Value> {
    validate::min_length("new_password", &body.new_password, 8)?;

    if !verify_password(&body.current_password, &user.password_hash) {
        tracing::warn!("Password change for '{}' rejected: wrong current password", user.username);
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let hash = hash_password(&body.new_password, state.config.security.bcrypt_cost)?;
    state.store.set_password_hash(user.id, &hash).await?;

    tracing::info!("User '{}' changed their password", user.username);
    Ok(ApiResponse::success(json!({"message": "Password changed successfully"})))
}

// handlers/protected/auth/session.rs - current-session endpoints

use axum::Extension;
use serde_json::{json, Value};

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// GET /api/auth/me - the authenticated operator's profile
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(user))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards them. The call still requires
/// a valid token so a stale client learns its session is gone.
pub async fn logout(Extension(user): Extension<CurrentUser>) -> ApiResult<Value> {
    tracing::info!("User '{}' logged out", user.username);
    Ok(ApiResponse::success(json!({"message": "Logged out successfully"})))
}

// handlers/protected/users.rs - /api/users (admin only)

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::auth::hash_password;
use crate::database::models::{NewUser, User, UserChanges};
use crate::error::ApiError;
use crate::handlers::{
    extract::{JsonBody, PathParam},
    validate,
};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

fn not_found() -> ApiError {
    ApiError::not_found("User not found")
}

pub async fn user_list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(ApiResponse::success(state.store.list_users().await?))
}

pub async fn user_create(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    JsonBody(body): JsonBody<CreateUser>,
) -> ApiResult<User> {
    validate::length("username", &body.username, 3, 50)?;
    validate::email("email", &body.email)?;
    validate::min_length("password", &body.password, 8)?;

    if state.store.get_user_by_username(&body.username).await?.is_some() {
        return Err(ApiError::conflict("Username already exists"));
    }

    let password_hash = hash_password(&body.password, state.config.security.bcrypt_cost)?;
    let user = state
        .store
        .create_user(NewUser {
            username: body.username,
            email: body.email,
            password_hash,
            is_admin: body.is_admin,
        })
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::conflict("Username already exists"),
            other => other,
        })?;

    tracing::info!("User '{}' created by '{}'", user.username, admin.username);
    Ok(ApiResponse::created(user))
}

pub async fn user_get(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<User> {
    let user = state.store.get_user(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(user))
}

pub async fn user_update(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    PathParam(id): PathParam<i32>,
    JsonBody(body): JsonBody<UpdateUser>,
) -> ApiResult<User> {
    if let Some(email) = &body.email {
        validate::email("email", email)?;
    }
    if id == admin.id && body.is_active == Some(false) {
        return Err(ApiError::bad_request("Cannot deactivate your own account"));
    }
    if id == admin.id && body.is_admin == Some(false) {
        return Err(ApiError::bad_request("Cannot remove your own admin privileges"));
    }

    let changes = UserChanges {
        email: body.email,
        is_active: body.is_active,
        is_admin: body.is_admin,
    };
    let user = state.store.update_user(id, changes).await?.ok_or_else(not_found)?;

    tracing::info!("User '{}' updated by '{}'", user.username, admin.username);
    Ok(ApiResponse::success(user))
}

pub async fn user_delete(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    PathParam(id): PathParam<i32>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }
    if !state.store.delete_user(id).await? {
        return Err(not_found());
    }

    tracing::info!("User {} deleted by '{}'", id, admin.username);
    Ok(ApiResponse::no_content())
}

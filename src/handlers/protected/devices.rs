// handlers/protected/devices.rs - /api/devices CRUD
//
// API keys are encrypted before they reach the store and never leave it:
// `Device` skips the ciphertext when serialized.

use axum::extract::State;
use serde::Deserialize;

use crate::database::models::{Device, DeviceChanges, NewDevice};
use crate::error::ApiError;
use crate::handlers::{
    extract::{JsonBody, PathParam},
    validate,
};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDevice {
    pub name: String,
    pub ip_address: String,
    pub api_key: String,
    pub device_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDevice {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub api_key: Option<String>,
    pub device_type: Option<String>,
    pub is_active: Option<bool>,
}

const DEVICE_TYPE_MAX: usize = 50;

fn not_found() -> ApiError {
    ApiError::not_found("Device not found")
}

pub async fn device_list(State(state): State<AppState>) -> ApiResult<Vec<Device>> {
    Ok(ApiResponse::success(state.store.list_devices().await?))
}

pub async fn device_create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateDevice>,
) -> ApiResult<Device> {
    validate::length("name", &body.name, 1, 100)?;
    validate::ip_address("ip_address", &body.ip_address)?;
    validate::non_empty("api_key", &body.api_key)?;
    validate::non_empty("device_type", &body.device_type)?;
    validate::length("device_type", &body.device_type, 1, DEVICE_TYPE_MAX)?;

    let device = state
        .store
        .create_device(NewDevice {
            name: body.name,
            ip_address: body.ip_address,
            api_key_encrypted: state.crypto.encrypt(&body.api_key),
            device_type: body.device_type,
        })
        .await?;

    tracing::info!("Device {} '{}' registered at {}", device.id, device.name, device.ip_address);
    Ok(ApiResponse::created(device))
}

pub async fn device_get(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<Device> {
    let device = state.store.get_device(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(device))
}

pub async fn device_update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    JsonBody(body): JsonBody<UpdateDevice>,
) -> ApiResult<Device> {
    if let Some(name) = &body.name {
        validate::length("name", name, 1, 100)?;
    }
    if let Some(ip) = &body.ip_address {
        validate::ip_address("ip_address", ip)?;
    }
    if let Some(key) = &body.api_key {
        validate::non_empty("api_key", key)?;
    }
    if let Some(kind) = &body.device_type {
        validate::non_empty("device_type", kind)?;
        validate::length("device_type", kind, 1, DEVICE_TYPE_MAX)?;
    }

    let changes = DeviceChanges {
        api_key_encrypted: body.api_key.as_deref().map(|key| state.crypto.encrypt(key)),
        name: body.name,
        ip_address: body.ip_address,
        device_type: body.device_type,
        is_active: body.is_active,
    };

    let device = if changes.is_empty() {
        state.store.get_device(id).await?
    } else {
        state.store.update_device(id, changes).await?
    };
    Ok(ApiResponse::success(device.ok_or_else(not_found)?))
}

/// Backups and schedules of the device go with it.
pub async fn device_delete(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<()> {
    if !state.store.delete_device(id).await? {
        return Err(not_found());
    }
    tracing::info!("Device {} deleted", id);
    Ok(ApiResponse::no_content())
}

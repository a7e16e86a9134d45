// handlers/protected/settings.rs - /api/settings
//
// Settings live in the key-value table as JSON text. A key that was never
// written falls back to the process configuration.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::database::models::settings::{BACKUP_PATH_KEY, DEFAULT_RETENTION_DAYS_KEY};
use crate::database::models::DeviceStorageStats;
use crate::error::ApiError;
use crate::handlers::{extract::JsonBody, validate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::storage;

pub const DEFAULT_RETENTION_DAYS: i32 = 30;

/// Leaves room in `backups.file_path` for `/<device_id>/<file name>`.
const BACKUP_PATH_MAX: usize = 255;

#[derive(Debug, Serialize)]
pub struct Settings {
    pub backup_path: String,
    pub default_retention_days: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub backup_path: Option<String>,
    pub default_retention_days: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StorageStats {
    pub backup_path: String,
    pub total_space: u64,
    pub used_space: u64,
    pub free_space: u64,
    pub usage_percent: f64,
    pub total_backups: i64,
    pub by_device: Vec<DeviceStorageStats>,
}

async fn stored<T: serde::de::DeserializeOwned>(
    state: &AppState,
    key: &str,
) -> Result<Option<T>, ApiError> {
    let Some(raw) = state.store.get_setting(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring malformed setting '{}': {}", key, e);
            Ok(None)
        }
    }
}

async fn store_value<T: Serialize>(state: &AppState, key: &str, value: &T) -> Result<(), ApiError> {
    let raw = serde_json::to_string(value)
        .map_err(|e| ApiError::internal_server_error(format!("Could not encode setting: {e}")))?;
    state.store.put_setting(key, &raw).await?;
    Ok(())
}

/// Directory new backups are written under.
pub async fn effective_backup_path(state: &AppState) -> Result<String, ApiError> {
    Ok(stored::<String>(state, BACKUP_PATH_KEY)
        .await?
        .unwrap_or_else(|| state.config.storage.backup_path.clone()))
}

/// Retention applied to schedules created without one.
pub async fn effective_retention_days(state: &AppState) -> Result<i32, ApiError> {
    Ok(stored::<i32>(state, DEFAULT_RETENTION_DAYS_KEY)
        .await?
        .unwrap_or(DEFAULT_RETENTION_DAYS))
}

async fn current(state: &AppState) -> Result<Settings, ApiError> {
    Ok(Settings {
        backup_path: effective_backup_path(state).await?,
        default_retention_days: effective_retention_days(state).await?,
    })
}

pub async fn settings_get(State(state): State<AppState>) -> ApiResult<Settings> {
    Ok(ApiResponse::success(current(&state).await?))
}

/// Admin only.
pub async fn settings_put(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SettingsUpdate>,
) -> ApiResult<Settings> {
    if let Some(path) = &body.backup_path {
        validate::non_empty("backup_path", path)?;
        validate::length("backup_path", path, 1, BACKUP_PATH_MAX)?;
    }
    if let Some(days) = body.default_retention_days {
        validate::range("default_retention_days", days, 1, 365)?;
    }

    if let Some(path) = &body.backup_path {
        store_value(&state, BACKUP_PATH_KEY, path).await?;
        tracing::info!("Backup path set to {}", path);
    }
    if let Some(days) = body.default_retention_days {
        store_value(&state, DEFAULT_RETENTION_DAYS_KEY, &days).await?;
        tracing::info!("Default retention set to {} days", days);
    }

    Ok(ApiResponse::success(current(&state).await?))
}

pub async fn storage_get(State(state): State<AppState>) -> ApiResult<StorageStats> {
    let backup_path = effective_backup_path(&state).await?;
    let disk = storage::disk_usage(&backup_path).await;
    let by_device = state.store.storage_by_device().await?;

    Ok(ApiResponse::success(StorageStats {
        total_backups: by_device.iter().map(|d| d.backup_count).sum(),
        backup_path,
        total_space: disk.total_space,
        used_space: disk.used_space,
        free_space: disk.free_space,
        usage_percent: disk.usage_percent,
        by_device,
    }))
}

// handlers/protected/backups.rs - /api/backups
//
// Backup rows are records of work done elsewhere. Creating one queues a
// `pending` entry; whatever fetches the configuration reports progress
// through the status endpoint.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::State;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::{
    Backup, BackupCalendarDay, BackupQuery, BackupStatus, BackupStatusUpdate, BackupType, Device,
    NewBackup,
};
use crate::error::ApiError;
use crate::handlers::extract::{JsonBody, PathParam, QueryParams};
use crate::handlers::protected::settings::effective_backup_path;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::storage;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct BackupListParams {
    pub device_id: Option<i32>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BackupPage {
    pub items: Vec<Backup>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBackup {
    pub device_id: i32,
    #[serde(default = "manual")]
    pub backup_type: BackupType,
}

fn manual() -> BackupType {
    BackupType::Manual
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: BackupStatus,
    pub error_message: Option<String>,
    pub file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub year: i32,
    pub month: u32,
    pub device_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct BackupCalendar {
    pub days: Vec<BackupCalendarDay>,
    pub month: u32,
    pub year: i32,
}

fn not_found() -> ApiError {
    ApiError::not_found("Backup not found")
}

pub async fn backup_list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<BackupListParams>,
) -> ApiResult<BackupPage> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::invalid_field("page", "must be at least 1"));
    }
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::invalid_field(
            "page_size",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    let status = params
        .status
        .as_deref()
        .map(str::parse::<BackupStatus>)
        .transpose()
        .map_err(|e| ApiError::invalid_field("status", e.to_string()))?;

    let (items, total) = state
        .store
        .list_backups(BackupQuery {
            device_id: params.device_id,
            status,
            limit: page_size,
            offset: (page - 1).saturating_mul(page_size),
        })
        .await?;

    Ok(ApiResponse::success(BackupPage {
        items,
        total,
        page,
        page_size,
        pages: (total + page_size - 1) / page_size,
    }))
}

/// `<backup_path>/<device_id>/<device>_<timestamp>.unf`
fn backup_location(root: &str, device: &Device, now: DateTime<Utc>) -> (String, PathBuf) {
    let slug: String = device
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let filename = format!("{}_{}.unf", slug, now.format("%Y%m%d_%H%M%S"));
    let path = FsPath::new(root).join(device.id.to_string()).join(&filename);
    (filename, path)
}

pub async fn backup_create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateBackup>,
) -> ApiResult<Backup> {
    let device = state
        .store
        .get_device(body.device_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Device not found"))?;

    let root = effective_backup_path(&state).await?;
    let (filename, path) = backup_location(&root, &device, Utc::now());

    let backup = state
        .store
        .create_backup(NewBackup {
            device_id: device.id,
            filename,
            file_path: path.to_string_lossy().into_owned(),
            backup_type: body.backup_type,
        })
        .await?;

    tracing::info!(
        "Queued {} backup {} for device '{}'",
        backup.backup_type.as_str(),
        backup.id,
        device.name
    );
    Ok(ApiResponse::created(backup))
}

pub async fn backup_get(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<Backup> {
    let backup = state.store.get_backup(id).await?.ok_or_else(not_found)?;
    Ok(ApiResponse::success(backup))
}

/// Drops the row and the stored file. A missing file is not an error.
pub async fn backup_delete(State(state): State<AppState>, PathParam(id): PathParam<i32>) -> ApiResult<()> {
    let backup = state.store.delete_backup(id).await?.ok_or_else(not_found)?;

    match storage::remove_backup_file(FsPath::new(&backup.file_path)).await {
        Ok(true) => tracing::info!("Removed backup file {}", backup.file_path),
        Ok(false) => tracing::debug!("Backup file {} was already gone", backup.file_path),
        Err(e) => tracing::warn!("Could not remove backup file {}: {}", backup.file_path, e),
    }

    Ok(ApiResponse::no_content())
}

pub async fn backup_status_put(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    JsonBody(body): JsonBody<StatusChange>,
) -> ApiResult<Backup> {
    if body.file_size.is_some_and(|size| size < 0) {
        return Err(ApiError::invalid_field("file_size", "must not be negative"));
    }

    let current = state.store.get_backup(id).await?.ok_or_else(not_found)?;
    if !current.status.can_transition_to(body.status) {
        return Err(ApiError::conflict(format!(
            "Cannot change backup status from {} to {}",
            current.status, body.status
        )));
    }

    let now = Utc::now();
    let update = BackupStatusUpdate {
        from: current.status,
        status: body.status,
        error_message: body.error_message,
        file_size: body.file_size,
        started_at: (body.status == BackupStatus::Running).then_some(now),
        completed_at: body.status.is_terminal().then_some(now),
    };

    let Some(backup) = state.store.update_backup_status(id, update).await? else {
        // Lost a race with another status change, or the row was deleted.
        let latest = state.store.get_backup(id).await?.ok_or_else(not_found)?;
        return Err(ApiError::conflict(format!(
            "Cannot change backup status from {} to {}",
            latest.status, body.status
        )));
    };
    tracing::info!("Backup {} is now {}", backup.id, backup.status);
    Ok(ApiResponse::success(backup))
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>, ApiError> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ApiError::invalid_field("year", "out of range"))
}

pub async fn backup_calendar(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CalendarParams>,
) -> ApiResult<BackupCalendar> {
    if !(1..=12).contains(&params.month) {
        return Err(ApiError::invalid_field("month", "must be between 1 and 12"));
    }

    let (next_year, next_month) = if params.month == 12 {
        (params.year.saturating_add(1), 1)
    } else {
        (params.year, params.month + 1)
    };
    let from = month_start(params.year, params.month)?;
    let to = month_start(next_year, next_month)?;

    let days = state.store.backup_calendar(from, to, params.device_id).await?;
    Ok(ApiResponse::success(BackupCalendar {
        days,
        month: params.month,
        year: params.year,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_files_are_grouped_by_device() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let device = Device {
            id: 3,
            name: "Main Gateway".into(),
            ip_address: "10.0.0.1".into(),
            api_key_encrypted: String::new(),
            device_type: "udm-pro".into(),
            model: None,
            firmware_version: None,
            mac_address: None,
            is_active: true,
            last_seen: None,
            created_at: now,
            updated_at: now,
        };
        let (filename, path) = backup_location("/backups", &device, now);
        assert_eq!(filename, "main_gateway_20240506_070809.unf");
        assert_eq!(path, PathBuf::from("/backups/3/main_gateway_20240506_070809.unf"));
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Manual => "manual",
            BackupType::Scheduled => "scheduled",
        }
    }
}

impl FromStr for BackupType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(BackupType::Manual),
            "scheduled" => Ok(BackupType::Scheduled),
            other => Err(UnknownVariant { kind: "backup type", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for BackupType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::Pending => "pending",
            BackupStatus::Running => "running",
            BackupStatus::Completed => "completed",
            BackupStatus::Failed => "failed",
        }
    }

    /// pending -> running -> completed | failed, and pending -> failed
    /// for jobs that never started.
    pub fn can_transition_to(&self, next: BackupStatus) -> bool {
        matches!(
            (self, next),
            (BackupStatus::Pending, BackupStatus::Running)
                | (BackupStatus::Pending, BackupStatus::Failed)
                | (BackupStatus::Running, BackupStatus::Completed)
                | (BackupStatus::Running, BackupStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupStatus::Completed | BackupStatus::Failed)
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BackupStatus::Pending),
            "running" => Ok(BackupStatus::Running),
            "completed" => Ok(BackupStatus::Completed),
            "failed" => Ok(BackupStatus::Failed),
            other => Err(UnknownVariant { kind: "backup status", value: other.to_string() }),
        }
    }
}

impl TryFrom<String> for BackupStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Backup {
    pub id: i32,
    pub device_id: i32,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    #[sqlx(try_from = "String")]
    pub backup_type: BackupType,
    #[sqlx(try_from = "String")]
    pub status: BackupStatus,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Joined from `devices.name`.
    #[sqlx(default)]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBackup {
    pub device_id: i32,
    pub filename: String,
    pub file_path: String,
    pub backup_type: BackupType,
}

/// A status change along with the columns it stamps. Applied only while
/// the row is still in `from`.
#[derive(Debug, Clone)]
pub struct BackupStatusUpdate {
    pub from: BackupStatus,
    pub status: BackupStatus,
    pub error_message: Option<String>,
    pub file_size: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BackupQuery {
    pub device_id: Option<i32>,
    pub status: Option<BackupStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BackupCalendarDay {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeviceStorageStats {
    pub device_id: i32,
    pub device_name: String,
    pub backup_count: i64,
    pub total_size: i64,
}

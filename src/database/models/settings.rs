use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Row of the `settings` key-value table. `value` holds JSON text.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SystemSetting {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

pub const BACKUP_PATH_KEY: &str = "backup_path";
pub const DEFAULT_RETENTION_DAYS_KEY: &str = "default_retention_days";

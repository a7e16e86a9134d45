use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// When backups for a device should happen. Stored, never executed here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Schedule {
    pub id: i32,
    pub device_id: i32,
    pub name: String,
    pub cron_expression: Option<String>,
    pub interval_hours: Option<i32>,
    pub retention_days: i32,
    pub is_enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub device_id: i32,
    pub name: String,
    pub cron_expression: Option<String>,
    pub interval_hours: Option<i32>,
    pub retention_days: i32,
    pub next_run: Option<DateTime<Utc>>,
}

/// Full replacement of the mutable columns, computed by the handler after
/// merging the request onto the current row.
#[derive(Debug, Clone)]
pub struct ScheduleChanges {
    pub name: String,
    pub cron_expression: Option<String>,
    pub interval_hours: Option<i32>,
    pub retention_days: i32,
    pub is_enabled: bool,
    pub next_run: Option<DateTime<Utc>>,
}

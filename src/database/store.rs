use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::manager::DatabaseError;
use super::models::{
    Backup, BackupCalendarDay, BackupQuery, BackupStatusUpdate, Device, DeviceChanges,
    DeviceStorageStats, NewBackup, NewDevice, NewSchedule, NewUser, Schedule, ScheduleChanges,
    User, UserChanges,
};

/// Every persistence operation the API needs.
///
/// `PgStore` backs production; `MemoryStore` serves the test suite and
/// throwaway local runs. Lookups by id return `Ok(None)` (or `Ok(false)`
/// for deletes) when the row does not exist; uniqueness violations surface
/// as `DatabaseError::Conflict`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // users
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;
    async fn get_user(&self, id: i32) -> Result<Option<User>, DatabaseError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;
    async fn find_admin(&self) -> Result<Option<User>, DatabaseError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>, DatabaseError>;
    async fn set_password_hash(&self, id: i32, password_hash: &str) -> Result<(), DatabaseError>;
    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> Result<(), DatabaseError>;
    async fn delete_user(&self, id: i32) -> Result<bool, DatabaseError>;

    // devices
    async fn list_devices(&self) -> Result<Vec<Device>, DatabaseError>;
    async fn get_device(&self, id: i32) -> Result<Option<Device>, DatabaseError>;
    async fn create_device(&self, device: NewDevice) -> Result<Device, DatabaseError>;
    async fn update_device(&self, id: i32, changes: DeviceChanges) -> Result<Option<Device>, DatabaseError>;
    /// Removes the device together with its backups and schedules.
    async fn delete_device(&self, id: i32) -> Result<bool, DatabaseError>;

    // backups
    /// One page of backups, newest first, plus the unpaged total.
    async fn list_backups(&self, query: BackupQuery) -> Result<(Vec<Backup>, i64), DatabaseError>;
    async fn get_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError>;
    async fn create_backup(&self, backup: NewBackup) -> Result<Backup, DatabaseError>;
    /// Compare-and-set on the status column: `Ok(None)` when the row is
    /// missing or no longer in `update.from`.
    async fn update_backup_status(&self, id: i32, update: BackupStatusUpdate) -> Result<Option<Backup>, DatabaseError>;
    /// Returns the removed row so the caller can clean up its file.
    async fn delete_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError>;
    async fn backup_calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        device_id: Option<i32>,
    ) -> Result<Vec<BackupCalendarDay>, DatabaseError>;
    async fn storage_by_device(&self) -> Result<Vec<DeviceStorageStats>, DatabaseError>;

    // schedules
    async fn list_schedules(&self, device_id: Option<i32>) -> Result<Vec<Schedule>, DatabaseError>;
    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, DatabaseError>;
    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, DatabaseError>;
    async fn update_schedule(&self, id: i32, changes: ScheduleChanges) -> Result<Option<Schedule>, DatabaseError>;
    async fn delete_schedule(&self, id: i32) -> Result<bool, DatabaseError>;

    // settings (JSON-encoded values)
    async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    async fn put_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

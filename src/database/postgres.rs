use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    Backup, BackupCalendarDay, BackupQuery, BackupStatusUpdate, Device, DeviceChanges,
    DeviceStorageStats, NewBackup, NewDevice, NewSchedule, NewUser, Schedule, ScheduleChanges,
    User, UserChanges,
};
use super::store::Store;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, is_admin, last_login, created_at";

const DEVICE_COLUMNS: &str = "id, name, ip_address, api_key_encrypted, device_type, model, \
     firmware_version, mac_address, is_active, last_seen, created_at, updated_at";

const BACKUP_SELECT: &str = "SELECT b.id, b.device_id, b.filename, b.file_path, b.file_size, \
     b.backup_type, b.status, b.error_message, b.started_at, b.completed_at, b.created_at, \
     d.name AS device_name \
     FROM backups b LEFT JOIN devices d ON d.id = b.device_id";

const SCHEDULE_SELECT: &str = "SELECT s.id, s.device_id, s.name, s.cron_expression, \
     s.interval_hours, s.retention_days, s.is_enabled, s.last_run, s.next_run, s.created_at, \
     s.updated_at, d.name AS device_name \
     FROM schedules s LEFT JOIN devices d ON d.id = s.device_id";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_admin(&self) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE is_admin = TRUE ORDER BY id LIMIT 1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                is_active = COALESCE($3, is_active), \
                is_admin = COALESCE($4, is_admin) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.is_active)
            .bind(changes.is_admin)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_password_hash(&self, id: i32, password_hash: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_devices(&self) -> Result<Vec<Device>, DatabaseError> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY name, id");
        Ok(sqlx::query_as::<_, Device>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_device(&self, id: i32) -> Result<Option<Device>, DatabaseError> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1");
        Ok(sqlx::query_as::<_, Device>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_device(&self, device: NewDevice) -> Result<Device, DatabaseError> {
        let sql = format!(
            "INSERT INTO devices (name, ip_address, api_key_encrypted, device_type) \
             VALUES ($1, $2, $3, $4) RETURNING {DEVICE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Device>(&sql)
            .bind(&device.name)
            .bind(&device.ip_address)
            .bind(&device.api_key_encrypted)
            .bind(&device.device_type)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_device(&self, id: i32, changes: DeviceChanges) -> Result<Option<Device>, DatabaseError> {
        let sql = format!(
            "UPDATE devices SET \
                name = COALESCE($2, name), \
                ip_address = COALESCE($3, ip_address), \
                api_key_encrypted = COALESCE($4, api_key_encrypted), \
                device_type = COALESCE($5, device_type), \
                is_active = COALESCE($6, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {DEVICE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Device>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.ip_address)
            .bind(changes.api_key_encrypted)
            .bind(changes.device_type)
            .bind(changes.is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_device(&self, id: i32) -> Result<bool, DatabaseError> {
        // backups and schedules go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_backups(&self, query: BackupQuery) -> Result<(Vec<Backup>, i64), DatabaseError> {
        let filter = "WHERE ($1::INTEGER IS NULL OR b.device_id = $1) \
                      AND ($2::TEXT IS NULL OR b.status = $2)";
        let status = query.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM backups b {filter}"))
            .bind(query.device_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!("{BACKUP_SELECT} {filter} ORDER BY b.created_at DESC, b.id DESC LIMIT $3 OFFSET $4");
        let items = sqlx::query_as::<_, Backup>(&sql)
            .bind(query.device_id)
            .bind(status)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn get_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError> {
        let sql = format!("{BACKUP_SELECT} WHERE b.id = $1");
        Ok(sqlx::query_as::<_, Backup>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_backup(&self, backup: NewBackup) -> Result<Backup, DatabaseError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO backups (device_id, filename, file_path, file_size, backup_type, status) \
             VALUES ($1, $2, $3, 0, $4, 'pending') RETURNING id",
        )
        .bind(backup.device_id)
        .bind(&backup.filename)
        .bind(&backup.file_path)
        .bind(backup.backup_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        self.get_backup(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("backup {id}")))
    }

    async fn update_backup_status(&self, id: i32, update: BackupStatusUpdate) -> Result<Option<Backup>, DatabaseError> {
        let result = sqlx::query(
            "UPDATE backups SET \
                status = $2, \
                error_message = COALESCE($3, error_message), \
                file_size = COALESCE($4, file_size), \
                started_at = COALESCE($5, started_at), \
                completed_at = COALESCE($6, completed_at) \
             WHERE id = $1 AND status = $7",
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.error_message)
        .bind(update.file_size)
        .bind(update.started_at)
        .bind(update.completed_at)
        .bind(update.from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_backup(id).await
    }

    async fn delete_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError> {
        let Some(backup) = self.get_backup(id).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM backups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(Some(backup))
    }

    async fn backup_calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        device_id: Option<i32>,
    ) -> Result<Vec<BackupCalendarDay>, DatabaseError> {
        Ok(sqlx::query_as::<_, BackupCalendarDay>(
            "SELECT (created_at AT TIME ZONE 'UTC')::DATE AS date, COUNT(*) AS count \
             FROM backups \
             WHERE created_at >= $1 AND created_at < $2 \
               AND ($3::INTEGER IS NULL OR device_id = $3) \
             GROUP BY 1 ORDER BY 1",
        )
        .bind(from)
        .bind(to)
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn storage_by_device(&self) -> Result<Vec<DeviceStorageStats>, DatabaseError> {
        Ok(sqlx::query_as::<_, DeviceStorageStats>(
            "SELECT d.id AS device_id, d.name AS device_name, \
                    COUNT(b.id) AS backup_count, \
                    COALESCE(SUM(b.file_size), 0)::BIGINT AS total_size \
             FROM devices d LEFT JOIN backups b ON b.device_id = d.id \
             GROUP BY d.id, d.name ORDER BY d.name, d.id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_schedules(&self, device_id: Option<i32>) -> Result<Vec<Schedule>, DatabaseError> {
        let sql = format!("{SCHEDULE_SELECT} WHERE ($1::INTEGER IS NULL OR s.device_id = $1) ORDER BY s.id");
        Ok(sqlx::query_as::<_, Schedule>(&sql)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, DatabaseError> {
        let sql = format!("{SCHEDULE_SELECT} WHERE s.id = $1");
        Ok(sqlx::query_as::<_, Schedule>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, DatabaseError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO schedules \
                (device_id, name, cron_expression, interval_hours, retention_days, next_run) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(schedule.device_id)
        .bind(&schedule.name)
        .bind(&schedule.cron_expression)
        .bind(schedule.interval_hours)
        .bind(schedule.retention_days)
        .bind(schedule.next_run)
        .fetch_one(&self.pool)
        .await?;

        self.get_schedule(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("schedule {id}")))
    }

    async fn update_schedule(&self, id: i32, changes: ScheduleChanges) -> Result<Option<Schedule>, DatabaseError> {
        let result = sqlx::query(
            "UPDATE schedules SET \
                name = $2, cron_expression = $3, interval_hours = $4, \
                retention_days = $5, is_enabled = $6, next_run = $7, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.cron_expression)
        .bind(changes.interval_hours)
        .bind(changes.retention_days)
        .bind(changes.is_enabled)
        .bind(changes.next_run)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_schedule(id).await
    }

    async fn delete_schedule(&self, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{
    Backup, BackupCalendarDay, BackupQuery, BackupStatus, BackupStatusUpdate, Device,
    DeviceChanges, DeviceStorageStats, NewBackup, NewDevice, NewSchedule, NewUser, Schedule,
    ScheduleChanges, User, UserChanges,
};
use super::store::Store;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    devices: BTreeMap<i32, Device>,
    backups: BTreeMap<i32, Backup>,
    schedules: BTreeMap<i32, Schedule>,
    settings: HashMap<String, String>,
    next_user: i32,
    next_device: i32,
    next_backup: i32,
    next_schedule: i32,
}

fn bump(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

impl Tables {
    fn device_name(&self, device_id: i32) -> Option<String> {
        self.devices.get(&device_id).map(|d| d.name.clone())
    }

    fn with_backup_device(&self, mut backup: Backup) -> Backup {
        backup.device_name = self.device_name(backup.device_id);
        backup
    }

    fn with_schedule_device(&self, mut schedule: Schedule) -> Schedule {
        schedule.device_name = self.device_name(schedule.device_id);
        schedule
    }

    fn require_device(&self, device_id: i32) -> Result<(), DatabaseError> {
        if self.devices.contains_key(&device_id) {
            Ok(())
        } else {
            Err(DatabaseError::NotFound(format!("device {device_id}")))
        }
    }
}

/// In-process store with the same observable behavior as `PgStore`.
///
/// Used by the test suite and by `serve --memory` for throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_admin(&self) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.is_admin).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(DatabaseError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let id = bump(&mut tables.next_user);
        let row = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_active: true,
            is_admin: user.is_admin,
            last_login: None,
            created_at: Utc::now(),
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(admin) = changes.is_admin {
            user.is_admin = admin;
        }
        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: i32, password_hash: &str) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn record_login(&self, id: i32, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, DatabaseError> {
        let mut devices: Vec<Device> = self.tables.read().await.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(devices)
    }

    async fn get_device(&self, id: i32) -> Result<Option<Device>, DatabaseError> {
        Ok(self.tables.read().await.devices.get(&id).cloned())
    }

    async fn create_device(&self, device: NewDevice) -> Result<Device, DatabaseError> {
        let mut tables = self.tables.write().await;
        let id = bump(&mut tables.next_device);
        let now = Utc::now();
        let row = Device {
            id,
            name: device.name,
            ip_address: device.ip_address,
            api_key_encrypted: device.api_key_encrypted,
            device_type: device.device_type,
            model: None,
            firmware_version: None,
            mac_address: None,
            is_active: true,
            last_seen: None,
            created_at: now,
            updated_at: now,
        };
        tables.devices.insert(id, row.clone());
        Ok(row)
    }

    async fn update_device(&self, id: i32, changes: DeviceChanges) -> Result<Option<Device>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(device) = tables.devices.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            device.name = name;
        }
        if let Some(ip) = changes.ip_address {
            device.ip_address = ip;
        }
        if let Some(key) = changes.api_key_encrypted {
            device.api_key_encrypted = key;
        }
        if let Some(kind) = changes.device_type {
            device.device_type = kind;
        }
        if let Some(active) = changes.is_active {
            device.is_active = active;
        }
        device.updated_at = Utc::now();
        Ok(Some(device.clone()))
    }

    async fn delete_device(&self, id: i32) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.devices.remove(&id).is_none() {
            return Ok(false);
        }
        tables.backups.retain(|_, b| b.device_id != id);
        tables.schedules.retain(|_, s| s.device_id != id);
        Ok(true)
    }

    async fn list_backups(&self, query: BackupQuery) -> Result<(Vec<Backup>, i64), DatabaseError> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&Backup> = tables
            .backups
            .values()
            .filter(|b| query.device_id.map_or(true, |id| b.device_id == id))
            .filter(|b| query.status.map_or(true, |s| b.status == s))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|b| tables.with_backup_device(b.clone()))
            .collect();
        Ok((items, total))
    }

    async fn get_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.backups.get(&id).map(|b| tables.with_backup_device(b.clone())))
    }

    async fn create_backup(&self, backup: NewBackup) -> Result<Backup, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.require_device(backup.device_id)?;

        let id = bump(&mut tables.next_backup);
        let row = Backup {
            id,
            device_id: backup.device_id,
            filename: backup.filename,
            file_path: backup.file_path,
            file_size: 0,
            backup_type: backup.backup_type,
            status: BackupStatus::Pending,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            device_name: None,
        };
        tables.backups.insert(id, row.clone());
        Ok(tables.with_backup_device(row))
    }

    async fn update_backup_status(&self, id: i32, update: BackupStatusUpdate) -> Result<Option<Backup>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(backup) = tables.backups.get_mut(&id) else {
            return Ok(None);
        };
        if backup.status != update.from {
            return Ok(None);
        }
        backup.status = update.status;
        if update.error_message.is_some() {
            backup.error_message = update.error_message;
        }
        if let Some(size) = update.file_size {
            backup.file_size = size;
        }
        if update.started_at.is_some() {
            backup.started_at = update.started_at;
        }
        if update.completed_at.is_some() {
            backup.completed_at = update.completed_at;
        }
        let row = backup.clone();
        Ok(Some(tables.with_backup_device(row)))
    }

    async fn delete_backup(&self, id: i32) -> Result<Option<Backup>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let removed = tables.backups.remove(&id);
        Ok(removed.map(|b| tables.with_backup_device(b)))
    }

    async fn backup_calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        device_id: Option<i32>,
    ) -> Result<Vec<BackupCalendarDay>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for backup in tables.backups.values() {
            if backup.created_at < from || backup.created_at >= to {
                continue;
            }
            if device_id.is_some_and(|id| backup.device_id != id) {
                continue;
            }
            *days.entry(backup.created_at.date_naive()).or_default() += 1;
        }
        Ok(days
            .into_iter()
            .map(|(date, count)| BackupCalendarDay { date, count })
            .collect())
    }

    async fn storage_by_device(&self) -> Result<Vec<DeviceStorageStats>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut stats: Vec<DeviceStorageStats> = tables
            .devices
            .values()
            .map(|device| {
                let backups = tables.backups.values().filter(|b| b.device_id == device.id);
                let (count, size) = backups.fold((0i64, 0i64), |(n, s), b| (n + 1, s + b.file_size));
                DeviceStorageStats {
                    device_id: device.id,
                    device_name: device.name.clone(),
                    backup_count: count,
                    total_size: size,
                }
            })
            .collect();
        stats.sort_by(|a, b| a.device_name.cmp(&b.device_name).then(a.device_id.cmp(&b.device_id)));
        Ok(stats)
    }

    async fn list_schedules(&self, device_id: Option<i32>) -> Result<Vec<Schedule>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .schedules
            .values()
            .filter(|s| device_id.map_or(true, |id| s.device_id == id))
            .map(|s| tables.with_schedule_device(s.clone()))
            .collect())
    }

    async fn get_schedule(&self, id: i32) -> Result<Option<Schedule>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.schedules.get(&id).map(|s| tables.with_schedule_device(s.clone())))
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> Result<Schedule, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.require_device(schedule.device_id)?;

        let id = bump(&mut tables.next_schedule);
        let now = Utc::now();
        let row = Schedule {
            id,
            device_id: schedule.device_id,
            name: schedule.name,
            cron_expression: schedule.cron_expression,
            interval_hours: schedule.interval_hours,
            retention_days: schedule.retention_days,
            is_enabled: true,
            last_run: None,
            next_run: schedule.next_run,
            created_at: now,
            updated_at: now,
            device_name: None,
        };
        tables.schedules.insert(id, row.clone());
        Ok(tables.with_schedule_device(row))
    }

    async fn update_schedule(&self, id: i32, changes: ScheduleChanges) -> Result<Option<Schedule>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(schedule) = tables.schedules.get_mut(&id) else {
            return Ok(None);
        };
        schedule.name = changes.name;
        schedule.cron_expression = changes.cron_expression;
        schedule.interval_hours = changes.interval_hours;
        schedule.retention_days = changes.retention_days;
        schedule.is_enabled = changes.is_enabled;
        schedule.next_run = changes.next_run;
        schedule.updated_at = Utc::now();
        let row = schedule.clone();
        Ok(Some(tables.with_schedule_device(row)))
    }

    async fn delete_schedule(&self, id: i32) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.schedules.remove(&id).is_some())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.tables.read().await.settings.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub mod backup;
pub mod device;
pub mod schedule;
pub mod settings;
pub mod user;

pub use backup::{
    Backup, BackupCalendarDay, BackupQuery, BackupStatus, BackupStatusUpdate, BackupType,
    DeviceStorageStats, NewBackup,
};
pub use device::{Device, DeviceChanges, NewDevice};
pub use schedule::{NewSchedule, Schedule, ScheduleChanges};
pub use settings::SystemSetting;
pub use user::{NewUser, User, UserChanges};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A managed network appliance. The API key only ever exists here in its
/// Fernet-encrypted form and is never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Device {
    pub id: i32,
    pub name: String,
    pub ip_address: String,
    #[serde(skip_serializing)]
    pub api_key_encrypted: String,
    pub device_type: String,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub mac_address: Option<String>,
    pub is_active: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub ip_address: String,
    pub api_key_encrypted: String,
    pub device_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceChanges {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub api_key_encrypted: Option<String>,
    pub device_type: Option<String>,
    pub is_active: Option<bool>,
}

impl DeviceChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ip_address.is_none()
            && self.api_key_encrypted.is_none()
            && self.device_type.is_none()
            && self.is_active.is_none()
    }
}

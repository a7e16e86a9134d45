//! Filesystem side of backup storage: disk usage of the backup directory and
//! removal of backup files.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Capacity of the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total_space: u64,
    pub used_space: u64,
    pub free_space: u64,
    pub usage_percent: f64,
}

impl DiskUsage {
    fn from_blocks(total: u64, free: u64) -> Self {
        let used = total.saturating_sub(free);
        let usage_percent = if total == 0 {
            0.0
        } else {
            (used as f64 / total as f64 * 1000.0).round() / 10.0
        };
        Self {
            total_space: total,
            used_space: used,
            free_space: free,
            usage_percent,
        }
    }
}

#[cfg(unix)]
fn statvfs(path: &Path) -> io::Result<DiskUsage> {
    let stat = nix::sys::statvfs::statvfs(path)?;
    let fragment = stat.fragment_size() as u64;
    Ok(DiskUsage::from_blocks(
        stat.blocks() as u64 * fragment,
        stat.blocks_available() as u64 * fragment,
    ))
}

#[cfg(not(unix))]
fn statvfs(_path: &Path) -> io::Result<DiskUsage> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "disk statistics unavailable"))
}

/// Disk usage for `path`, all zeros when it cannot be determined (missing
/// directory, non-Unix host).
pub async fn disk_usage(path: impl Into<PathBuf>) -> DiskUsage {
    let path = path.into();
    let result = tokio::task::spawn_blocking(move || {
        let usage = statvfs(&path);
        (path, usage)
    })
    .await;

    match result {
        Ok((_, Ok(usage))) => usage,
        Ok((path, Err(e))) => {
            tracing::warn!("Could not read disk usage for {}: {}", path.display(), e);
            DiskUsage::default()
        }
        Err(e) => {
            tracing::error!("Disk usage task failed: {}", e);
            DiskUsage::default()
        }
    }
}

/// Delete a stored backup file. A file that is already gone is not an error.
pub async fn remove_backup_file(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

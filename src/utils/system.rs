// src/utils/system.rs: System functions

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use sysinfo::Disks;

use crate::config::defs::RUN_TIMESTAMP_FORMAT;


#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total_gib: f64,
    pub free_gib: f64,
    pub used_pct: f64,
}


/// Timestamp naming the run directory and log file, e.g. `19-10-2026_14-03-59`.
pub fn run_timestamp() -> String {
    chrono::Local::now().format(RUN_TIMESTAMP_FORMAT).to_string()
}


/// Finds the disk holding `path` and reports its capacity.
///
/// # Arguments
///
/// * `path` - Any path on the filesystem of interest. Need not exist yet;
///   the closest existing ancestor is used.
///
/// # Returns
///
/// DiskUsage of the mount with the longest matching prefix.
pub fn disk_usage(path: &Path) -> Result<DiskUsage> {
    let probe = path
        .ancestors()
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("No existing ancestor for {}", path.display()))?
        .canonicalize()?;

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| probe.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .ok_or_else(|| anyhow!("No disk found for {}", probe.display()))?;

    Ok(usage_from_bytes(disk.mount_point().to_path_buf(), disk.total_space(), disk.available_space()))
}


fn usage_from_bytes(mount_point: PathBuf, total: u64, available: u64) -> DiskUsage {
    let total_gib = total as f64 / 1_073_741_824.0;
    let free_gib = available as f64 / 1_073_741_824.0;
    let used_pct = if total == 0 {
        0.0
    } else {
        (((total - available.min(total)) as f64 / total as f64) * 10_000.0).round() / 100.0
    };
    DiskUsage { mount_point, total_gib, free_gib, used_pct }
}

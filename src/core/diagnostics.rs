//! Host diagnostics snapshot
//!
//! Best-effort: fields the platform cannot report are left empty. On Linux
//! the CPU model, memory figures and mounted block devices come from `/proc`;
//! per-volume capacity is queried through `fs2`.

use super::log_context::LogContext;
use serde::Serialize;
use std::fs;

/// One mounted volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveInfo {
    pub device: String,
    pub mount_point: String,
    pub filesystem: String,
    /// Capacity in bytes, `None` when the volume cannot be queried
    pub total_bytes: Option<u64>,
    /// Space available to unprivileged users, in bytes
    pub available_bytes: Option<u64>,
}

impl DriveInfo {
    fn query(device: &str, mount_point: &str, filesystem: &str) -> Self {
        Self {
            device: device.to_string(),
            mount_point: mount_point.to_string(),
            filesystem: filesystem.to_string(),
            total_bytes: fs2::total_space(mount_point).ok(),
            available_bytes: fs2::available_space(mount_point).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemDiagnostics {
    pub os: &'static str,
    pub arch: &'static str,
    pub cpu_model: Option<String>,
    pub logical_cores: usize,
    pub total_memory_bytes: Option<u64>,
    pub available_memory_bytes: Option<u64>,
    pub drives: Vec<DriveInfo>,
}

impl SystemDiagnostics {
    /// Collect a snapshot of the current host
    pub fn collect(include_drives: bool) -> Self {
        let (total_memory_bytes, available_memory_bytes) = read_meminfo();
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            cpu_model: read_cpu_model(),
            logical_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            total_memory_bytes,
            available_memory_bytes,
            drives: if include_drives { read_drives() } else { Vec::new() },
        }
    }

    /// Flatten into record fields, omitting unknown values
    pub fn to_context(&self) -> LogContext {
        let mut context = LogContext::new()
            .with_field("os", self.os)
            .with_field("arch", self.arch)
            .with_field("logical_cores", self.logical_cores);

        if let Some(model) = &self.cpu_model {
            context.add_field("cpu_model", model.as_str());
        }
        if let Some(total) = self.total_memory_bytes {
            context.add_field("total_memory_mb", (total / (1024 * 1024)) as i64);
        }
        if let Some(available) = self.available_memory_bytes {
            context.add_field("available_memory_mb", (available / (1024 * 1024)) as i64);
        }
        for (index, drive) in self.drives.iter().enumerate() {
            context.add_field(
                format!("drive{}", index),
                format!("{} on {} ({})", drive.device, drive.mount_point, drive.filesystem),
            );
            if let Some(total) = drive.total_bytes {
                context.add_field(
                    format!("drive{}_total_mb", index),
                    (total / (1024 * 1024)) as i64,
                );
            }
            if let Some(available) = drive.available_bytes {
                context.add_field(
                    format!("drive{}_available_mb", index),
                    (available / (1024 * 1024)) as i64,
                );
            }
        }
        context
    }
}

fn read_cpu_model() -> Option<String> {
    let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, model)| model.trim().to_string())
}

/// `(MemTotal, MemAvailable)` in bytes
fn read_meminfo() -> (Option<u64>, Option<u64>) {
    let Ok(meminfo) = fs::read_to_string("/proc/meminfo") else {
        return (None, None);
    };

    let field = |name: &str| {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };
    (field("MemTotal:"), field("MemAvailable:"))
}

/// Block-device mounts from `/proc/mounts`
fn read_drives() -> Vec<DriveInfo> {
    let Ok(mounts) = fs::read_to_string("/proc/mounts") else {
        return Vec::new();
    };

    mounts
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mount_point = parts.next()?;
            let filesystem = parts.next()?;
            device
                .starts_with("/dev/")
                .then(|| DriveInfo::query(device, mount_point, filesystem))
        })
        .collect()
}

//! Global and per-sink configuration
//!
//! Both structs deserialize from JSON with every field optional; missing
//! fields take their `Default` values. Validation happens when a sink is
//! constructed, not when the config is parsed, so a config can be built up
//! incrementally and checked once.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use crate::sinks::RotationInterval;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default async buffer threshold in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Largest accepted async buffer threshold (64 MiB)
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Logger-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Records below this priority are dropped before anything else runs
    pub level: LogLevel,
    /// Colorize console output
    pub color: bool,
    /// Global console display switch
    pub console_enabled: bool,
    /// Global file storage switch
    pub file_enabled: bool,
    pub json: bool,
    pub pretty_json: bool,
    /// Create a console sink when the logger is constructed
    pub auto_sink: bool,
    pub show_time: bool,
    pub show_module: bool,
    pub show_function: bool,
    pub show_filename: bool,
    pub show_lineno: bool,
    pub show_thread: bool,
    pub timestamp_format: TimestampFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            color: true,
            console_enabled: true,
            file_enabled: true,
            json: false,
            pretty_json: false,
            auto_sink: true,
            show_time: true,
            show_module: true,
            show_function: false,
            show_filename: false,
            show_lineno: false,
            show_thread: false,
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LoggerError::config("LoggerConfig", e.to_string()))
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_console_enabled(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_file_enabled(mut self, enabled: bool) -> Self {
        self.file_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    #[must_use]
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    #[must_use]
    pub fn with_auto_sink(mut self, auto_sink: bool) -> Self {
        self.auto_sink = auto_sink;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_show_time(mut self, show: bool) -> Self {
        self.show_time = show;
        self
    }

    #[must_use]
    pub fn with_show_module(mut self, show: bool) -> Self {
        self.show_module = show;
        self
    }

    #[must_use]
    pub fn with_show_function(mut self, show: bool) -> Self {
        self.show_function = show;
        self
    }

    /// Show `file:line` for records that carry a source location
    #[must_use]
    pub fn with_show_location(mut self, show: bool) -> Self {
        self.show_filename = show;
        self.show_lineno = show;
        self
    }

    #[must_use]
    pub fn with_show_thread(mut self, show: bool) -> Self {
        self.show_thread = show;
        self
    }
}

/// Where a sink delivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Console,
    File(PathBuf),
    Tcp(String),
    Udp(String),
}

/// Immutable description of one sink
///
/// ```
/// use rust_log_pipeline::{LogLevel, SinkConfig};
///
/// let config = SinkConfig::file("logs/app.log")
///     .with_size_limit_str("10MB")
///     .with_retention(5)
///     .with_level(LogLevel::Warning);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub name: Option<String>,
    /// `None` = console; `tcp://host:port` or `udp://host:port` = network
    pub path: Option<String>,
    pub rotation: Option<RotationInterval>,
    /// Rotation size threshold in bytes
    pub size_limit: Option<u64>,
    /// Human-readable size threshold such as `"10MB"`; used when
    /// `size_limit` is unset
    pub size_limit_str: Option<String>,
    /// Number of archives kept after rotation; unlimited when unset
    pub retention: Option<usize>,
    /// Gzip archives after rotation
    pub compress: bool,
    /// Per-sink minimum level
    pub level: Option<LogLevel>,
    /// Per-sink maximum level
    pub max_level: Option<LogLevel>,
    pub async_write: bool,
    /// Buffered bytes that trigger a write-through when `async_write` is on
    pub buffer_size: usize,
    pub json: Option<bool>,
    pub pretty_json: Option<bool>,
    pub color: Option<bool>,
    pub enabled: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: None,
            path: None,
            rotation: None,
            size_limit: None,
            size_limit_str: None,
            retention: None,
            compress: false,
            level: None,
            max_level: None,
            async_write: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            json: None,
            pretty_json: None,
            color: None,
            enabled: true,
        }
    }
}

impl SinkConfig {
    /// Console sink
    #[must_use]
    pub fn console() -> Self {
        Self::default()
    }

    /// File sink at `path`
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Network sink; `uri` is `tcp://host:port` or `udp://host:port`
    #[must_use]
    pub fn network(uri: impl Into<String>) -> Self {
        Self::file(uri)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LoggerError::config("SinkConfig", e.to_string()))
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, interval: RotationInterval) -> Self {
        self.rotation = Some(interval);
        self
    }

    #[must_use]
    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.size_limit = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_size_limit_str(mut self, size: impl Into<String>) -> Self {
        self.size_limit_str = Some(size.into());
        self
    }

    #[must_use]
    pub fn with_retention(mut self, count: usize) -> Self {
        self.retention = Some(count);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_max_level(mut self, level: LogLevel) -> Self {
        self.max_level = Some(level);
        self
    }

    /// Buffer writes, flushing once `buffer_size` bytes have accumulated
    #[must_use]
    pub fn with_async_write(mut self, buffer_size: usize) -> Self {
        self.async_write = true;
        self.buffer_size = buffer_size;
        self
    }

    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    #[must_use]
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = Some(pretty);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Display name: the explicit name, else the path, else `console`
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.path.clone())
            .unwrap_or_else(|| "console".to_string())
    }

    /// Resolve and validate the destination
    pub fn destination(&self) -> Result<Destination> {
        let Some(path) = self.path.as_deref() else {
            return Ok(Destination::Console);
        };

        if path.trim().is_empty() {
            return Err(LoggerError::config("SinkConfig", "path must not be empty"));
        }

        if let Some(addr) = path.strip_prefix("tcp://") {
            return network_address(path, addr).map(Destination::Tcp);
        }
        if let Some(addr) = path.strip_prefix("udp://") {
            return network_address(path, addr).map(Destination::Udp);
        }
        if path.contains("://") {
            return Err(LoggerError::config(
                "SinkConfig",
                format!("unsupported URI scheme in '{}'", path),
            ));
        }

        Ok(Destination::File(PathBuf::from(path)))
    }

    /// Effective size threshold in bytes
    pub fn effective_size_limit(&self) -> Result<Option<u64>> {
        let limit = match (self.size_limit, self.size_limit_str.as_deref()) {
            (Some(bytes), _) => Some(bytes),
            (None, Some(text)) => Some(parse_size(text)?),
            (None, None) => None,
        };

        if limit == Some(0) {
            return Err(LoggerError::config(
                "SinkConfig",
                "size limit must be greater than zero",
            ));
        }
        Ok(limit)
    }

    /// Reject malformed settings
    pub fn validate(&self) -> Result<()> {
        let destination = self.destination()?;
        let size_limit = self.effective_size_limit()?;

        if self.async_write && self.buffer_size == 0 {
            return Err(LoggerError::config(
                "SinkConfig",
                "buffer_size must be greater than zero when async_write is enabled",
            ));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return Err(LoggerError::config(
                "SinkConfig",
                format!(
                    "buffer_size {} exceeds the maximum of {} bytes",
                    self.buffer_size, MAX_BUFFER_SIZE
                ),
            ));
        }

        if let (Some(min), Some(max)) = (self.level, self.max_level) {
            if min > max {
                return Err(LoggerError::config(
                    "SinkConfig",
                    format!("level {} is above max_level {}", min, max),
                ));
            }
        }

        let rotates = self.rotation.is_some() || size_limit.is_some();
        if rotates && !matches!(destination, Destination::File(_)) {
            return Err(LoggerError::config(
                "SinkConfig",
                "rotation and size limits only apply to file sinks",
            ));
        }

        Ok(())
    }
}

fn network_address(uri: &str, addr: &str) -> Result<String> {
    if !cfg!(feature = "network") {
        return Err(LoggerError::config(
            "SinkConfig",
            format!("'{}' needs the `network` feature", uri),
        ));
    }

    let invalid = |reason: &str| LoggerError::config("SinkConfig", format!("{} in '{}'", reason, uri));

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid("invalid port")),
        Ok(_) => Ok(addr.to_string()),
    }
}

/// Parse a human-readable size: `"512"`, `"64KB"`, `"10 MB"`, `"1.5GB"`.
///
/// Units are binary (1KB = 1024 bytes) and case-insensitive.
pub fn parse_size(text: &str) -> Result<u64> {
    let invalid = || LoggerError::config("size", format!("cannot parse size '{}'", text));

    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        _ => return Err(invalid()),
    };

    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as u64)
}

//! Log file rotation
//!
//! A [`Rotation`] decides when the live file of a file sink must be retired
//! and performs the retirement:
//!
//! 1. the live file is closed and renamed to an archive name
//!    `<stem>.<YYYYMMDD-HHMMSS>.<seq>[.<ext>]` in the same directory
//! 2. a fresh file is opened at the original path
//! 3. the archive is optionally gzipped (`.gz` appended)
//! 4. old archives beyond the retention count are deleted, oldest first
//!
//! Archive sequence numbers are monotonic and recovered from the directory
//! listing on construction, so ordering survives restarts and multiple
//! rotations within one second. No other on-disk state is kept.
//!
//! Failures degrade: if the rename fails the original path is reopened and
//! writing continues there; an error is returned only when no handle can be
//! opened at all.

use crate::core::{LoggerError, Result, SinkConfig};
use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Pause before retrying after a failed rename, so a persistent failure
/// does not turn every write into a rename attempt
const ROTATION_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Time-based rotation period, bucketed in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationInterval {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RotationInterval {
    /// Bucket index of `at`; a rotation is due whenever it changes
    pub fn bucket(self, at: &DateTime<Local>) -> i64 {
        let naive = at.naive_local();
        match self {
            RotationInterval::Minutely => naive.and_utc().timestamp().div_euclid(60),
            RotationInterval::Hourly => naive.and_utc().timestamp().div_euclid(3600),
            RotationInterval::Daily => i64::from(naive.num_days_from_ce()),
            RotationInterval::Weekly => {
                let week = naive.iso_week();
                i64::from(week.year()) * 100 + i64::from(week.week())
            }
            RotationInterval::Monthly => i64::from(naive.year()) * 12 + i64::from(naive.month0()),
            RotationInterval::Yearly => i64::from(naive.year()),
        }
    }
}

impl FromStr for RotationInterval {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minutely" => Ok(RotationInterval::Minutely),
            "hourly" => Ok(RotationInterval::Hourly),
            "daily" => Ok(RotationInterval::Daily),
            "weekly" => Ok(RotationInterval::Weekly),
            "monthly" => Ok(RotationInterval::Monthly),
            "yearly" => Ok(RotationInterval::Yearly),
            _ => Err(LoggerError::config(
                "rotation",
                format!("unknown rotation interval '{}'", s),
            )),
        }
    }
}

/// One archived log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub sequence: u64,
    pub compressed: bool,
}

/// Rotation policy and state for one live file
#[derive(Debug)]
pub struct Rotation {
    path: PathBuf,
    stem: String,
    extension: Option<String>,
    interval: Option<RotationInterval>,
    size_limit: Option<u64>,
    retention: Option<usize>,
    compress: bool,
    /// Time bucket of the last rotation (or of the file's mtime at startup)
    bucket: Option<i64>,
    next_sequence: u64,
    retry_after: Option<Instant>,
}

impl Rotation {
    /// Rotation for `path` with no triggers; add them with the `with_*`
    /// methods
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log")
            .to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);

        let mut rotation = Self {
            path,
            stem,
            extension,
            interval: None,
            size_limit: None,
            retention: None,
            compress: false,
            bucket: None,
            next_sequence: 1,
            retry_after: None,
        };
        rotation.next_sequence = rotation
            .archives()
            .ok()
            .and_then(|archives| archives.last().map(|a| a.sequence + 1))
            .unwrap_or(1);
        rotation
    }

    /// Rotation described by a sink config, or `None` when it sets neither
    /// an interval nor a size limit
    pub fn from_config(path: &Path, config: &SinkConfig) -> Result<Option<Self>> {
        let size_limit = config.effective_size_limit()?;
        if config.rotation.is_none() && size_limit.is_none() {
            return Ok(None);
        }

        let mut rotation = Rotation::new(path).with_compression(config.compress);
        if let Some(interval) = config.rotation {
            rotation = rotation.with_interval(interval);
        }
        if let Some(limit) = size_limit {
            rotation = rotation.with_size_limit(limit);
        }
        if let Some(keep) = config.retention {
            rotation = rotation.with_retention(keep);
        }
        Ok(Some(rotation))
    }

    /// Rotate when the local-time bucket changes. The starting bucket comes
    /// from the live file's mtime, so a file left over from an earlier
    /// period is rotated on the first write.
    #[must_use]
    pub fn with_interval(mut self, interval: RotationInterval) -> Self {
        let started: DateTime<Local> = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map(DateTime::from)
            .unwrap_or_else(|_| Local::now());
        self.interval = Some(interval);
        self.bucket = Some(interval.bucket(&started));
        self
    }

    /// Rotate once the live file reaches `bytes`
    #[must_use]
    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.size_limit = Some(bytes);
        self
    }

    /// Keep at most `count` archives
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

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the next write should rotate first.
    ///
    /// The size is read from the filesystem on every call, so external
    /// truncation or deletion is noticed. An empty file is never rotated;
    /// its time bucket is simply advanced.
    pub fn is_due(&mut self) -> bool {
        if let Some(retry_at) = self.retry_after {
            if Instant::now() < retry_at {
                return false;
            }
            self.retry_after = None;
        }

        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if let Some(limit) = self.size_limit {
            if size >= limit {
                return true;
            }
        }

        if let Some(interval) = self.interval {
            let current = interval.bucket(&Local::now());
            if self.bucket != Some(current) {
                if size == 0 {
                    self.bucket = Some(current);
                    return false;
                }
                return true;
            }
        }

        false
    }

    /// Retire the live file. `handle` is the sink's open handle; it is
    /// closed before the rename and replaced with a handle to the fresh
    /// file. On failure it is left `None` and an error is returned.
    pub fn rotate(&mut self, handle: &mut Option<File>) -> Result<()> {
        if let Some(file) = handle.as_mut() {
            file.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }
        *handle = None;

        let now = Local::now();
        self.bucket = self.interval.map(|interval| interval.bucket(&now));
        let archive = self.archive_path(&now, self.next_sequence);

        if let Err(e) = fs::rename(&self.path, &archive) {
            let error = LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to rename to '{}': {}", archive.display(), e),
            );
            eprintln!(
                "[LOGGER WARNING] {}. Continuing with current file.",
                error
            );
            self.retry_after = Some(Instant::now() + ROTATION_RETRY_BACKOFF);

            return match open_log_file(&self.path) {
                Ok(file) => {
                    *handle = Some(file);
                    Ok(())
                }
                Err(reopen) => {
                    eprintln!(
                        "[LOGGER ERROR] Failed to reopen log file after rotation failure: {}",
                        reopen
                    );
                    Err(error)
                }
            };
        }

        self.next_sequence += 1;
        let file = open_log_file(&self.path).map_err(|e| {
            LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        *handle = Some(file);

        if self.compress {
            if let Err(e) = compress_file(&archive) {
                eprintln!("[LOGGER WARNING] Archive left uncompressed: {}", e);
            }
        }
        if let Err(e) = self.enforce_retention() {
            eprintln!("[LOGGER WARNING] Retention check failed: {}", e);
        }

        Ok(())
    }

    /// Delete the oldest archives until at most `retention` remain.
    /// Returns how many were removed.
    pub fn enforce_retention(&self) -> Result<usize> {
        let Some(keep) = self.retention else {
            return Ok(0);
        };

        let archives = self.archives()?;
        let excess = archives.len().saturating_sub(keep);
        let mut removed = 0;
        for archive in archives.into_iter().take(excess) {
            match fs::remove_file(&archive.path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!(
                    "[LOGGER WARNING] Failed to remove old archive {}: {}",
                    archive.path.display(),
                    e
                ),
            }
        }
        Ok(removed)
    }

    /// Archives belonging to this file, oldest first
    pub fn archives(&self) -> Result<Vec<Archive>> {
        let directory = self.directory();
        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LoggerError::io_operation(
                    "list log archives",
                    format!("Failed to read directory '{}'", directory.display()),
                    e,
                ))
            }
        };

        let mut archives: Vec<Archive> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let (sequence, compressed) = self.parse_archive_name(name.to_str()?)?;
                Some(Archive {
                    path: entry.path(),
                    sequence,
                    compressed,
                })
            })
            .collect();
        archives.sort_by_key(|archive| archive.sequence);
        Ok(archives)
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn archive_path(&self, at: &DateTime<Local>, sequence: u64) -> PathBuf {
        let mut name = format!(
            "{}.{}.{:06}",
            self.stem,
            at.format("%Y%m%d-%H%M%S"),
            sequence
        );
        if let Some(extension) = &self.extension {
            name.push('.');
            name.push_str(extension);
        }
        self.directory().join(name)
    }

    /// `(sequence, compressed)` if `name` is one of this file's archives
    fn parse_archive_name(&self, name: &str) -> Option<(u64, bool)> {
        let rest = name.strip_prefix(self.stem.as_str())?.strip_prefix('.')?;
        let (rest, compressed) = match rest.strip_suffix(".gz") {
            Some(inner) => (inner, true),
            None => (rest, false),
        };
        let rest = match &self.extension {
            Some(extension) => rest.strip_suffix(extension.as_str())?.strip_suffix('.')?,
            None => rest,
        };

        let (stamp, sequence) = rest.split_once('.')?;
        let stamp_ok = stamp.len() == 15
            && stamp
                .bytes()
                .enumerate()
                .all(|(i, b)| if i == 8 { b == b'-' } else { b.is_ascii_digit() });
        if !stamp_ok || sequence.len() < 6 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        sequence.parse().ok().map(|seq| (seq, compressed))
    }
}

/// Open a log file for appending, creating it if needed
pub(crate) fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Gzip `path` to `path.gz`, streaming through a temporary file. The
/// original is removed only after the compressed file is in place.
fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = with_suffix(path, ".gz");
    let temp_path = with_suffix(path, ".gz.tmp");

    let result = (|| -> io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, &gz_path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log archive",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(gz_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;
    use tempfile::tempdir;

    fn write_live(path: &Path, handle: &mut Option<File>, text: &str) {
        if handle.is_none() {
            *handle = Some(open_log_file(path).unwrap());
        }
        handle.as_mut().unwrap().write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("Daily".parse::<RotationInterval>().unwrap(), RotationInterval::Daily);
        assert_eq!("weekly".parse::<RotationInterval>().unwrap(), RotationInterval::Weekly);
        assert!("fortnightly".parse::<RotationInterval>().unwrap_err().is_config_error());
    }

    #[test]
    fn test_buckets() {
        let at = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 0).single().unwrap();
        let same_hour = Local.with_ymd_and_hms(2025, 1, 8, 10, 59, 59).single().unwrap();
        let next_hour = Local.with_ymd_and_hms(2025, 1, 8, 11, 0, 0).single().unwrap();
        let next_day = Local.with_ymd_and_hms(2025, 1, 9, 10, 30, 0).single().unwrap();

        let hourly = RotationInterval::Hourly;
        assert_eq!(hourly.bucket(&at), hourly.bucket(&same_hour));
        assert_ne!(hourly.bucket(&at), hourly.bucket(&next_hour));

        let daily = RotationInterval::Daily;
        assert_eq!(daily.bucket(&at), daily.bucket(&next_hour));
        assert_ne!(daily.bucket(&at), daily.bucket(&next_day));

        let monthly = RotationInterval::Monthly;
        assert_eq!(monthly.bucket(&at), monthly.bucket(&next_day));
    }

    #[test]
    fn test_archive_name_roundtrip() {
        let rotation = Rotation::new("/var/log/app.log");
        let at = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).single().unwrap();
        let archive = rotation.archive_path(&at, 7);

        assert_eq!(
            archive.file_name().unwrap().to_str().unwrap(),
            "app.20250108-103045.000007.log"
        );
        assert_eq!(
            rotation.parse_archive_name("app.20250108-103045.000007.log"),
            Some((7, false))
        );
        assert_eq!(
            rotation.parse_archive_name("app.20250108-103045.000007.log.gz"),
            Some((7, true))
        );
        assert_eq!(rotation.parse_archive_name("app.log"), None);
        assert_eq!(rotation.parse_archive_name("app.log.1"), None);
        assert_eq!(rotation.parse_archive_name("other.20250108-103045.000007.log"), None);
    }

    #[test]
    fn test_archive_name_without_extension() {
        let rotation = Rotation::new("logs/server");
        assert_eq!(
            rotation.parse_archive_name("server.20250108-103045.000012"),
            Some((12, false))
        );
        assert_eq!(rotation.parse_archive_name("server.20250108-103045.000012.log"), None);
    }

    #[test]
    fn test_size_trigger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;

        let mut rotation = Rotation::new(&path).with_size_limit(16);
        write_live(&path, &mut handle, "short\n");
        assert!(!rotation.is_due());

        write_live(&path, &mut handle, "this pushes it over\n");
        assert!(rotation.is_due());

        rotation.rotate(&mut handle).unwrap();
        assert!(handle.is_some());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(!rotation.is_due());

        let archives = rotation.archives().unwrap();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].sequence, 1);
        assert_eq!(
            fs::read_to_string(&archives[0].path).unwrap(),
            "short\nthis pushes it over\n"
        );
    }

    #[test]
    fn test_retention_keeps_newest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;
        let mut rotation = Rotation::new(&path).with_size_limit(1).with_retention(2);

        for i in 1..=3 {
            write_live(&path, &mut handle, &format!("record {}\n", i));
            assert!(rotation.is_due());
            rotation.rotate(&mut handle).unwrap();
        }

        let archives = rotation.archives().unwrap();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].sequence, 2);
        assert_eq!(archives[1].sequence, 3);
        assert_eq!(fs::read_to_string(&archives[0].path).unwrap(), "record 2\n");
        assert_eq!(fs::read_to_string(&archives[1].path).unwrap(), "record 3\n");
    }

    #[test]
    fn test_sequence_recovered_from_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;
        let mut rotation = Rotation::new(&path).with_size_limit(1);

        for _ in 0..2 {
            write_live(&path, &mut handle, "x\n");
            rotation.rotate(&mut handle).unwrap();
        }
        drop(handle);

        let reopened = Rotation::new(&path);
        assert_eq!(reopened.next_sequence, 3);
    }

    #[test]
    fn test_compressed_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;
        let mut rotation = Rotation::new(&path)
            .with_size_limit(1)
            .with_compression(true);

        write_live(&path, &mut handle, "compress me\n");
        rotation.rotate(&mut handle).unwrap();

        let archives = rotation.archives().unwrap();
        assert_eq!(archives.len(), 1);
        assert!(archives[0].compressed);
        assert!(archives[0].path.to_str().unwrap().ends_with(".log.gz"));

        let mut decoder = flate2::read::GzDecoder::new(File::open(&archives[0].path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "compress me\n");
    }

    #[test]
    fn test_time_trigger_skips_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;
        let mut rotation = Rotation::new(&path).with_interval(RotationInterval::Hourly);

        // Pretend the last rotation happened long ago
        rotation.bucket = Some(0);
        write_live(&path, &mut handle, "");
        assert!(!rotation.is_due());
        assert_ne!(rotation.bucket, Some(0));

        rotation.bucket = Some(0);
        write_live(&path, &mut handle, "stale\n");
        assert!(rotation.is_due());
        rotation.rotate(&mut handle).unwrap();
        assert!(!rotation.is_due());
    }

    #[test]
    fn test_missing_live_file_reopens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut handle = None;
        let mut rotation = Rotation::new(&path).with_size_limit(1);

        // Live file never created: the rename fails, a fresh file is opened
        rotation.rotate(&mut handle).unwrap();
        assert!(handle.is_some());
        assert!(path.exists());
        assert!(rotation.archives().unwrap().is_empty());
        assert!(!rotation.is_due());
    }

    #[test]
    fn test_from_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");

        let none = Rotation::from_config(&path, &SinkConfig::file("app.log")).unwrap();
        assert!(none.is_none());

        let config = SinkConfig::file("app.log")
            .with_size_limit_str("1KB")
            .with_retention(3);
        let rotation = Rotation::from_config(&path, &config).unwrap().unwrap();
        assert_eq!(rotation.size_limit, Some(1024));
        assert_eq!(rotation.retention, Some(3));

        let bad = SinkConfig::file("app.log").with_size_limit_str("huge");
        assert!(Rotation::from_config(&path, &bad).is_err());
    }
}

//! File writer with optional rotation

use super::rotation::{open_log_file, Rotation};
use super::writer::{DestinationKind, SinkWriter};
use crate::core::{LoggerError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends to a file. Writes go straight to the OS; buffering, when wanted,
/// is done by the owning sink.
pub struct FileWriter {
    path: PathBuf,
    name: String,
    file: Option<File>,
    rotation: Option<Rotation>,
}

impl FileWriter {
    /// Open `path` for appending, creating parent directories as needed
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let file = open_log_file(&path).map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;

        Ok(Self {
            name: path.display().to_string(),
            path,
            file: Some(file),
            rotation: None,
        })
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rotation(&self) -> Option<&Rotation> {
        self.rotation.as_ref()
    }

    /// Open handle, reopening the path if an earlier rotation lost it
    fn handle(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let file = open_log_file(&self.path).map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("No writable handle: {}", e),
                )
            })?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File handle not initialized"))
    }
}

impl SinkWriter for FileWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let path = self.path.display().to_string();
        self.handle()?
            .write_all(bytes)
            .map_err(|e| LoggerError::file_sink(path, format!("Failed to write: {}", e)))
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::File
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn rotation_due(&mut self) -> bool {
        self.rotation.as_mut().is_some_and(Rotation::is_due)
    }

    fn rotate(&mut self) -> Result<()> {
        match self.rotation.as_mut() {
            Some(rotation) => rotation.rotate(&mut self.file),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let mut writer = FileWriter::new(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");
        assert_eq!(writer.kind(), DestinationKind::File);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let mut writer = FileWriter::new(&path).unwrap();
        writer.write_all(b"appended\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nappended\n");
    }

    #[test]
    fn test_rotation_through_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut writer = FileWriter::new(&path)
            .unwrap()
            .with_rotation(Rotation::new(&path).with_size_limit(8));

        writer.write_all(b"0123456789\n").unwrap();
        assert!(writer.rotation_due());
        writer.rotate().unwrap();
        writer.write_all(b"next\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "next\n");
        let archives = writer.rotation().unwrap().archives().unwrap();
        assert_eq!(archives.len(), 1);
    }

    #[test]
    fn test_no_rotation_configured() {
        let dir = tempdir().unwrap();
        let mut writer = FileWriter::new(dir.path().join("plain.log")).unwrap();
        assert!(!writer.rotation_due());
        assert!(writer.rotate().is_ok());
    }
}

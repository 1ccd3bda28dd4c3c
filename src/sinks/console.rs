//! Console writer

use super::writer::{DestinationKind, SinkWriter};
use crate::core::{LogLevel, Record, Result};
use std::io::Write;

/// Writes to stdout, or stderr for ERROR and above
pub struct ConsoleWriter {
    stderr_level: LogLevel,
}

impl ConsoleWriter {
    pub fn new() -> Self {
        Self {
            stderr_level: LogLevel::Error,
        }
    }

    /// Lowest level routed to stderr
    #[must_use]
    pub fn with_stderr_level(mut self, level: LogLevel) -> Self {
        self.stderr_level = level;
        self
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkWriter for ConsoleWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }

    fn write_record(&mut self, record: &Record, bytes: &[u8]) -> Result<()> {
        if record.priority() >= self.stderr_level.priority() {
            let mut err = std::io::stderr().lock();
            err.write_all(bytes)?;
            err.flush()?;
            Ok(())
        } else {
            self.write_all(bytes)
        }
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn kind(&self) -> DestinationKind {
        DestinationKind::Console
    }

    fn name(&self) -> &str {
        "console"
    }
}

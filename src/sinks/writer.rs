//! Destination writer trait

use crate::core::{Record, Result};

/// Broad class of a destination; drives color defaults and the global
/// console/file switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    Console,
    File,
    Network,
    Custom,
}

/// Byte-level output for one sink.
///
/// The sink owns formatting, buffering and level checks; a writer only moves
/// bytes. Implement this to plug a custom destination in through
/// `Logger::add_sink_with_writer`.
pub trait SinkWriter: Send {
    /// Write a complete chunk (one or more newline-terminated records)
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Write one formatted record. Writers that route by level override
    /// this; the default forwards to `write_all`.
    fn write_record(&mut self, _record: &Record, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)
    }

    fn flush(&mut self) -> Result<()>;

    fn kind(&self) -> DestinationKind;

    fn name(&self) -> &str;

    /// Whether the backing file should be rotated before the next write
    fn rotation_due(&mut self) -> bool {
        false
    }

    fn rotate(&mut self) -> Result<()> {
        Ok(())
    }
}

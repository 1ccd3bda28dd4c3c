//! One delivery destination
//!
//! A [`Sink`] applies its own admission checks, triggers rotation, formats,
//! and then writes or buffers. Its writer, buffer and rotation state sit
//! behind the sink's own mutex, so an administrative `flush()` can never
//! interleave with a half-finished `write()`.

use super::console::ConsoleWriter;
use super::file::FileWriter;
use super::rotation::Rotation;
use super::writer::{DestinationKind, SinkWriter};
use crate::core::config::Destination;
use crate::core::formatter::{ColorCallback, FormatConfig, Formatter};
use crate::core::{LoggerConfig, NetworkStats, Record, Result, SinkConfig};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stable handle for a registered sink.
///
/// Ids are handed out in increasing order and never reused, so removing one
/// sink leaves every other handle valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    pub(crate) const fn new(raw: u64) -> Self {
        SinkId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SinkState {
    writer: Box<dyn SinkWriter>,
    buffer: Vec<u8>,
}

impl SinkState {
    /// Write out and clear the buffer. The buffer is cleared even when the
    /// write fails, so a retry never duplicates bytes.
    fn drain(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buffer);
        self.writer.write_all(&pending)?;
        self.writer.flush()
    }

    /// Like `drain`, but a failed write puts the bytes back so they reach
    /// the next file instead of being lost
    fn drain_or_keep(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buffer);
        if let Err(e) = self.writer.write_all(&pending) {
            self.buffer = pending;
            return Err(e);
        }
        self.writer.flush()
    }
}

pub struct Sink {
    id: SinkId,
    config: SinkConfig,
    kind: DestinationKind,
    name: String,
    enabled: AtomicBool,
    formatter: Formatter,
    state: Mutex<SinkState>,
}

impl Sink {
    /// Validate `config` and open its destination
    pub(crate) fn open(
        id: SinkId,
        config: SinkConfig,
        network_stats: &Arc<NetworkStats>,
    ) -> Result<Self> {
        config.validate()?;

        let writer: Box<dyn SinkWriter> = match config.destination()? {
            Destination::Console => Box::new(ConsoleWriter::new()),
            Destination::File(path) => {
                let mut writer = FileWriter::new(&path)?;
                if let Some(rotation) = Rotation::from_config(&path, &config)? {
                    writer = writer.with_rotation(rotation);
                }
                Box::new(writer)
            }
            #[cfg(feature = "network")]
            Destination::Tcp(address) => Box::new(super::network::TcpWriter::connect(
                address,
                Arc::clone(network_stats),
            )?),
            #[cfg(feature = "network")]
            Destination::Udp(address) => Box::new(super::network::UdpWriter::connect(
                address,
                Arc::clone(network_stats),
            )?),
            #[cfg(not(feature = "network"))]
            Destination::Tcp(address) | Destination::Udp(address) => {
                let _ = network_stats;
                return Err(crate::core::LoggerError::config(
                    "SinkConfig",
                    format!("network sink '{}' needs the `network` feature", address),
                ));
            }
        };

        Ok(Self::with_writer(id, config, writer))
    }

    /// Wrap a caller-supplied writer
    pub(crate) fn with_writer(id: SinkId, config: SinkConfig, writer: Box<dyn SinkWriter>) -> Self {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| writer.name().to_string());
        Self {
            id,
            kind: writer.kind(),
            name,
            enabled: AtomicBool::new(config.enabled),
            formatter: Formatter::new(),
            state: Mutex::new(SinkState {
                writer,
                buffer: Vec::new(),
            }),
            config,
        }
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DestinationKind {
        self.kind
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Bytes waiting in the async buffer
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Whether this sink takes records at `priority`
    fn accepts(&self, priority: u8) -> bool {
        let above_min = self.config.level.map_or(true, |min| priority >= min.priority());
        let below_max = self.config.max_level.map_or(true, |max| priority <= max.priority());
        above_min && below_max
    }

    /// Deliver one record. Every step may end delivery early: disabled
    /// sink, level bounds, global console/file switch. Then rotation,
    /// formatting, and the write or buffer append.
    pub fn write(
        &self,
        record: &Record,
        global: &LoggerConfig,
        color_callback: Option<&ColorCallback>,
    ) -> Result<()> {
        if !self.is_enabled() || !self.accepts(record.priority()) {
            return Ok(());
        }
        match self.kind {
            DestinationKind::Console if !global.console_enabled => return Ok(()),
            DestinationKind::File if !global.file_enabled => return Ok(()),
            _ => {}
        }

        let mut state = self.state.lock();

        // Buffered records belong to the file being retired. If they cannot
        // be written there they are kept for the fresh file and the error
        // is reported once this record has been handled.
        let mut drain_error = None;
        if state.writer.rotation_due() {
            if let Err(e) = state.drain_or_keep() {
                eprintln!(
                    "[LOGGER WARNING] Sink '{}' could not write buffered records before rotation: {}",
                    self.name, e
                );
                drain_error = Some(e);
            }
            state.writer.rotate()?;
        }

        let format = FormatConfig::effective(global, &self.config, self.kind);
        let mut line = self.formatter.render(record, &format, color_callback)?;
        line.push('\n');

        if self.config.async_write && self.kind != DestinationKind::Console {
            state.buffer.extend_from_slice(line.as_bytes());
            if state.buffer.len() >= self.config.buffer_size {
                state.drain()?;
            }
        } else {
            state.writer.write_record(record, line.as_bytes())?;
        }

        match drain_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Write out buffered bytes and flush the writer. Calling it again
    /// with nothing buffered writes nothing.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.drain()?;
        state.writer.flush()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let pending = state.buffer.len();
        if let Err(e) = state.drain().and_then(|_| state.writer.flush()) {
            eprintln!(
                "[LOGGER WARNING] Sink '{}' failed to flush on shutdown ({} buffered bytes): {}",
                self.name, pending, e
            );
        }
    }
}

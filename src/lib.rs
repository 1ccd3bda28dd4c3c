//! # Rust Log Pipeline
//!
//! A structured logging runtime. Every record passes through a fixed
//! pipeline: level threshold, bound context, filter, sampler, log callback,
//! then fan-out to each registered sink.
//!
//! ## Features
//!
//! - **Admission control**: rule-based [`Filter`] and a [`Sampler`] with five
//!   strategies (none, probability, rate limit, every-Nth, adaptive)
//! - **Sinks**: console, file with time/size rotation, retention and gzip
//!   archives, TCP and UDP (`network` feature), or any [`SinkWriter`]
//! - **Per-sink policy**: level bounds, JSON or text, color, buffered writes
//! - **Bound context and custom levels** on the [`Logger`] façade
//!
//! ## Example
//!
//! ```no_run
//! use rust_log_pipeline::prelude::*;
//!
//! # fn main() -> rust_log_pipeline::Result<()> {
//! let logger = Logger::builder()
//!     .level(LogLevel::Debug)
//!     .sink(
//!         SinkConfig::file("logs/app.log")
//!             .with_rotation(RotationInterval::Daily)
//!             .with_retention(7)
//!             .with_compression(true),
//!     )
//!     .build()?;
//!
//! logger.bind("request_id", "abc");
//! logger.info("request accepted")?;
//! logger.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        CustomLevel, FieldValue, Filter, FilterAction, FilterRule, LogContext, LogLevel, Logger,
        LoggerBuilder, LoggerConfig, LoggerError, Record, Result, Sampler, SamplingStrategy,
        SinkConfig, TimestampFormat,
    };
    pub use crate::sinks::{RotationInterval, SinkId, SinkWriter};
}

pub use crate::core::{
    parse_size, ColorCallback, CustomLevel, Destination, DriveInfo, FieldValue, Filter,
    FilterAction, FilterRule, FormatConfig, Formatter, Location, LogCallback, LogContext, LogLevel,
    Logger, LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, NetworkStats, Record,
    RecordPredicate, Result, RuleKind, Sampler, SamplerMetrics, SamplerObserver, SamplingStrategy,
    SinkConfig, SystemDiagnostics, TimestampFormat, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE,
};
pub use crate::sinks::{
    Archive, ConsoleWriter, DestinationKind, FileWriter, Rotation, RotationInterval, Sink, SinkId,
    SinkWriter,
};
#[cfg(feature = "network")]
pub use crate::sinks::{TcpWriter, UdpWriter};

//! Core pipeline types: levels, records, admission stages, formatting and
//! the logger façade

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod log_context;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod sampling;
pub mod timestamp;

pub use config::{
    parse_size, Destination, LoggerConfig, SinkConfig, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE,
};
pub use diagnostics::{DriveInfo, SystemDiagnostics};
pub use error::{LoggerError, Result};
pub use filter::{Filter, FilterAction, FilterRule, RecordPredicate, RuleKind};
pub use formatter::{ColorCallback, FormatConfig, Formatter};
pub use log_context::{FieldValue, LogContext};
pub use log_level::{CustomLevel, LogLevel};
pub use logger::{LogCallback, Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, NetworkStats};
pub use record::{Location, Record};
pub use sampling::{Sampler, SamplerMetrics, SamplerObserver, SamplingStrategy};
pub use timestamp::TimestampFormat;

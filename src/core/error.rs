//! Error types for the logging pipeline

use crate::sinks::SinkId;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Network transport error
    #[error("Network error for '{address}': {message}")]
    NetworkError { address: String, message: String },

    /// No sink registered under the handle
    #[error("No sink registered with id {0}")]
    SinkNotFound(SinkId),

    /// Custom level lookup failed
    #[error("Unknown log level: '{0}'")]
    UnknownLevel(String),

    /// User callback failed
    #[error("Callback error: {0}")]
    CallbackError(String),

    /// One or more sinks failed during a fan-out
    #[error("Delivery failed on {failed} sink(s); first error: {first}")]
    DeliveryFailed {
        failed: usize,
        first: Box<LoggerError>,
    },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(address: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::NetworkError {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a callback error
    pub fn callback<S: Into<String>>(msg: S) -> Self {
        LoggerError::CallbackError(msg.into())
    }

    /// Summarize a fan-out where `failed` sinks reported errors
    pub fn delivery_failed(failed: usize, first: LoggerError) -> Self {
        LoggerError::DeliveryFailed {
            failed,
            first: Box::new(first),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error is a configuration rejection
    pub fn is_config_error(&self) -> bool {
        matches!(self, LoggerError::InvalidConfiguration { .. })
    }
}

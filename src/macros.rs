//! Logging macros with `format!` arguments and source location capture.
//!
//! Each macro records `module_path!()`, `file!()` and `line!()` of the call
//! site and returns the logger's `Result<()>`.
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! # fn main() -> rust_log_pipeline::Result<()> {
//! let logger = Logger::with_config(LoggerConfig::default().with_auto_sink(false));
//!
//! info!(logger, "Server started")?;
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port)?;
//! # Ok(())
//! # }
//! ```

/// Call-site location for the macros below
#[doc(hidden)]
#[macro_export]
macro_rules! __location {
    () => {
        $crate::Location::new(module_path!(), file!(), line!())
    };
}

/// Log at an explicit level.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::with_config(LoggerConfig::default().with_auto_sink(false));
/// use rust_log_pipeline::log;
/// log!(logger, LogLevel::Warning, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at($level, format!($($arg)+), $crate::__location!())
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! success {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Success, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! fail {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fail, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log at a registered custom level, by name.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # use colored::Color;
/// # let logger = Logger::with_config(LoggerConfig::default().with_auto_sink(false));
/// use rust_log_pipeline::custom;
/// logger.add_custom_level(CustomLevel::new("AUDIT", 35, Color::Magenta));
/// custom!(logger, "AUDIT", "user {} changed role", 42).unwrap();
/// assert!(custom!(logger, "MISSING", "nope").is_err());
/// ```
#[macro_export]
macro_rules! custom {
    ($logger:expr, $name:expr, $($arg:tt)+) => {
        $logger.custom_at($name, format!($($arg)+), $crate::__location!())
    };
}

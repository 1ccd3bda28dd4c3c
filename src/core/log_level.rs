//! Log level definitions

use colored::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in severities. The discriminant is the numeric priority used for
/// every threshold comparison in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Trace = 5,
    Debug = 10,
    #[default]
    Info = 20,
    Success = 25,
    Warning = 30,
    Error = 40,
    Fail = 45,
    Critical = 50,
}

impl LogLevel {
    /// All built-in levels in ascending priority order
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fail,
        LogLevel::Critical,
    ];

    #[inline]
    pub const fn priority(self) -> u8 {
        self as u8
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fail => "FAIL",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Exact lookup by priority
    pub fn from_priority(priority: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.priority() == priority)
    }

    /// Highest built-in level whose priority does not exceed `priority`.
    ///
    /// Priorities below TRACE map to TRACE.
    pub fn floor(priority: u8) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|level| level.priority() <= priority)
            .unwrap_or(LogLevel::Trace)
    }

    pub fn color_code(&self) -> Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => BrightBlack,
            LogLevel::Debug => Blue,
            LogLevel::Info => White,
            LogLevel::Success => Green,
            LogLevel::Warning => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fail => Magenta,
            LogLevel::Critical => BrightRed,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "SUCCESS" => Ok(LogLevel::Success),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "FAIL" => Ok(LogLevel::Fail),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// A user-registered severity with its own name, priority and color.
///
/// Custom levels live in the logger's registry and are compared against
/// built-in thresholds by their registered priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLevel {
    pub name: String,
    pub priority: u8,
    pub color: Color,
}

impl CustomLevel {
    pub fn new(name: impl Into<String>, priority: u8, color: Color) -> Self {
        Self {
            name: name.into(),
            priority,
            color,
        }
    }

    /// Built-in level this custom level sits on
    pub fn base_level(&self) -> LogLevel {
        LogLevel::floor(self.priority)
    }
}

//! Log record: one emitted event

use super::log_context::{escape_control, LogContext};
use super::log_level::{CustomLevel, LogLevel};
use chrono::{DateTime, SubsecRound, Utc};
use colored::Color;
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Source location of a log call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub module: Option<String>,
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Location {
    /// Location as captured by the logging macros
    pub fn new(module: &str, file: &str, line: u32) -> Self {
        Self {
            module: Some(module.to_string()),
            function: None,
            file: Some(file.to_string()),
            line: Some(line),
        }
    }

    pub fn module(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

/// One log event.
///
/// Built by the logger immediately before dispatch and dropped once the
/// fan-out completes. The bound context is copied in, so a record never
/// shares state with the logger or with other records.
#[derive(Debug, Clone)]
pub struct Record {
    /// Capture time, millisecond precision
    pub timestamp: DateTime<Utc>,
    /// Built-in level, or the base level of `custom_level`
    pub level: LogLevel,
    pub custom_level: Option<CustomLevel>,
    pub message: String,
    pub module: Option<String>,
    pub function: Option<String>,
    pub filename: Option<String>,
    pub line: Option<u32>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub context: LogContext,
}

impl Record {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        escape_control(message)
    }

    pub fn new(level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(3),
            level,
            custom_level: None,
            message: Self::sanitize_message(message.as_ref()),
            module: None,
            function: None,
            filename: None,
            line: None,
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            context: LogContext::new(),
        }
    }

    /// Record at a registered custom level
    pub fn custom(level: CustomLevel, message: impl AsRef<str>) -> Self {
        let mut record = Self::new(level.base_level(), message);
        record.custom_level = Some(level);
        record
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.module = location.module;
        self.function = location.function;
        self.filename = location.file;
        self.line = location.line;
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    /// Priority used for every threshold comparison
    pub fn priority(&self) -> u8 {
        self.custom_level
            .as_ref()
            .map_or(self.level.priority(), |custom| custom.priority)
    }

    /// Display name of the record's level
    pub fn level_name(&self) -> &str {
        match &self.custom_level {
            Some(custom) => &custom.name,
            None => self.level.to_str(),
        }
    }

    pub fn color(&self) -> Color {
        self.custom_level
            .as_ref()
            .map_or(self.level.color_code(), |custom| custom.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_sanitized() {
        let record = Record::new(LogLevel::Info, "line1\nline2\tend\r");
        assert_eq!(record.message, "line1\\nline2\\tend\\r");
    }

    #[test]
    fn test_timestamp_millisecond_precision() {
        let record = Record::new(LogLevel::Info, "tick");
        assert_eq!(record.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_custom_level_priority_and_name() {
        let notice = CustomLevel::new("NOTICE", 35, Color::Cyan);
        let record = Record::custom(notice, "disk at 80%");

        assert_eq!(record.priority(), 35);
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.level_name(), "NOTICE");
        assert_eq!(record.color(), Color::Cyan);
    }

    #[test]
    fn test_location() {
        let record = Record::new(LogLevel::Debug, "query")
            .with_location(Location::new("db::pool", "src/db/pool.rs", 42).with_function("acquire"));

        assert_eq!(record.module.as_deref(), Some("db::pool"));
        assert_eq!(record.function.as_deref(), Some("acquire"));
        assert_eq!(record.filename.as_deref(), Some("src/db/pool.rs"));
        assert_eq!(record.line, Some(42));
    }

    #[test]
    fn test_thread_id_cached() {
        let a = Record::new(LogLevel::Info, "a");
        let b = Record::new(LogLevel::Info, "b");
        assert_eq!(a.thread_id, b.thread_id);
    }
}

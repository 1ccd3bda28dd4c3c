//! Record rendering
//!
//! The formatter turns a [`Record`] into one line of text or one JSON
//! document. It never mutates the record; sinks own the returned string.

use super::config::{LoggerConfig, SinkConfig};
use super::error::Result;
use super::record::Record;
use super::timestamp::TimestampFormat;
use crate::sinks::DestinationKind;
use colored::Colorize;
use std::sync::Arc;

/// Recolors a rendered text line: receives the record and the plain line,
/// returns the line to write.
pub type ColorCallback = Arc<dyn Fn(&Record, &str) -> Result<String> + Send + Sync>;

/// Formatting options after sink overrides have been applied
#[derive(Debug, Clone, PartialEq)]
pub struct FormatConfig {
    pub json: bool,
    pub pretty_json: bool,
    pub color: bool,
    pub show_time: bool,
    pub show_module: bool,
    pub show_function: bool,
    pub show_filename: bool,
    pub show_lineno: bool,
    pub show_thread: bool,
    pub timestamp_format: TimestampFormat,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self::from_global(&LoggerConfig::default())
    }
}

impl FormatConfig {
    /// Options taken straight from the logger config
    pub fn from_global(global: &LoggerConfig) -> Self {
        Self {
            json: global.json,
            pretty_json: global.pretty_json,
            color: global.color,
            show_time: global.show_time,
            show_module: global.show_module,
            show_function: global.show_function,
            show_filename: global.show_filename,
            show_lineno: global.show_lineno,
            show_thread: global.show_thread,
            timestamp_format: global.timestamp_format.clone(),
        }
    }

    /// Global options with the sink's overrides applied.
    ///
    /// Color is off for anything that is not a console unless the sink
    /// forces it on.
    pub fn effective(global: &LoggerConfig, sink: &SinkConfig, kind: DestinationKind) -> Self {
        let mut config = Self::from_global(global);
        if let Some(json) = sink.json {
            config.json = json;
        }
        if let Some(pretty) = sink.pretty_json {
            config.pretty_json = pretty;
        }
        config.color = match sink.color {
            Some(forced) => forced,
            None => kind == DestinationKind::Console && global.color,
        };
        config
    }
}

/// Renders records as text or JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter;

impl Formatter {
    pub fn new() -> Self {
        Formatter
    }

    /// Render according to `config.json`
    pub fn render(
        &self,
        record: &Record,
        config: &FormatConfig,
        color_callback: Option<&ColorCallback>,
    ) -> Result<String> {
        if config.json {
            self.format_json(record, config)
        } else {
            self.format(record, config, color_callback)
        }
    }

    /// Text layout:
    /// `[timestamp] [LEVEL] [thread] module:function file:line message k=v ...`
    ///
    /// Each bracketed or location part is present only when its show flag is
    /// set and the record carries the value.
    pub fn format(
        &self,
        record: &Record,
        config: &FormatConfig,
        color_callback: Option<&ColorCallback>,
    ) -> Result<String> {
        let mut parts: Vec<String> = Vec::with_capacity(6);

        if config.show_time {
            parts.push(format!(
                "[{}]",
                config.timestamp_format.format(&record.timestamp)
            ));
        }

        let level = format!("{:<8}", record.level_name());
        let builtin_color = config.color && color_callback.is_none();
        if builtin_color {
            parts.push(format!("[{}]", level.color(record.color())));
        } else {
            parts.push(format!("[{}]", level));
        }

        if config.show_thread {
            let thread = record.thread_name.as_deref().unwrap_or(&record.thread_id);
            parts.push(format!("[{}]", thread));
        }

        if let Some(origin) = Self::origin(record, config) {
            parts.push(origin);
        }
        if let Some(source) = Self::source(record, config) {
            parts.push(source);
        }

        parts.push(record.message.clone());
        if !record.context.is_empty() {
            parts.push(record.context.format_fields());
        }

        let line = parts.join(" ");
        match color_callback {
            Some(callback) if config.color => callback(record, &line),
            _ => Ok(line),
        }
    }

    /// `module:function`, either half optional
    fn origin(record: &Record, config: &FormatConfig) -> Option<String> {
        let module = record.module.as_deref().filter(|_| config.show_module);
        let function = record.function.as_deref().filter(|_| config.show_function);
        match (module, function) {
            (Some(m), Some(f)) => Some(format!("{}:{}", m, f)),
            (Some(m), None) => Some(m.to_string()),
            (None, Some(f)) => Some(f.to_string()),
            (None, None) => None,
        }
    }

    /// `file:line`, either half optional
    fn source(record: &Record, config: &FormatConfig) -> Option<String> {
        let file = record.filename.as_deref().filter(|_| config.show_filename);
        let line = record.line.filter(|_| config.show_lineno);
        match (file, line) {
            (Some(f), Some(l)) => Some(format!("{}:{}", f, l)),
            (Some(f), None) => Some(f.to_string()),
            (None, Some(l)) => Some(format!("line {}", l)),
            (None, None) => None,
        }
    }

    /// JSON object with `timestamp`, `level`, `priority`, `message`, the
    /// enabled location and thread keys, and the context flattened in.
    /// Context keys never overwrite the fixed keys.
    pub fn format_json(&self, record: &Record, config: &FormatConfig) -> Result<String> {
        use serde_json::{Map, Value};

        let mut object = Map::new();
        object.insert(
            "timestamp".to_string(),
            config.timestamp_format.to_json_value(&record.timestamp),
        );
        object.insert("level".to_string(), Value::from(record.level_name()));
        object.insert("priority".to_string(), Value::from(record.priority()));
        object.insert("message".to_string(), Value::from(record.message.as_str()));

        if config.show_module {
            if let Some(module) = &record.module {
                object.insert("module".to_string(), Value::from(module.as_str()));
            }
        }
        if config.show_function {
            if let Some(function) = &record.function {
                object.insert("function".to_string(), Value::from(function.as_str()));
            }
        }
        if config.show_filename {
            if let Some(file) = &record.filename {
                object.insert("file".to_string(), Value::from(file.as_str()));
            }
        }
        if config.show_lineno {
            if let Some(line) = record.line {
                object.insert("line".to_string(), Value::from(line));
            }
        }
        if config.show_thread {
            object.insert("thread_id".to_string(), Value::from(record.thread_id.as_str()));
            if let Some(name) = &record.thread_name {
                object.insert("thread_name".to_string(), Value::from(name.as_str()));
            }
        }

        for (key, value) in record.context.fields() {
            object
                .entry(key.clone())
                .or_insert_with(|| value.to_json_value());
        }

        let value = Value::Object(object);
        let rendered = if config.pretty_json {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(rendered)
    }
}

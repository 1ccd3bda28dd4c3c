//! Logger façade and dispatch
//!
//! One mutex guards the sink set, bound context, custom levels, callbacks
//! and the enabled flag. Dispatch holds it for the whole fan-out, so records
//! reach every sink in call order and in registration order.

use super::config::{LoggerConfig, SinkConfig};
use super::diagnostics::SystemDiagnostics;
use super::error::{LoggerError, Result};
use super::filter::Filter;
use super::formatter::ColorCallback;
use super::log_context::{FieldValue, LogContext};
use super::log_level::{CustomLevel, LogLevel};
use super::metrics::{LoggerMetrics, NetworkStats};
use super::record::{Location, Record};
use super::sampling::Sampler;
use crate::sinks::{ConsoleWriter, Sink, SinkId, SinkWriter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Invoked with every admitted record before the fan-out.
///
/// Runs while the logger lock is held; it must not log through the same
/// logger.
pub type LogCallback = Arc<dyn Fn(&Record) -> Result<()> + Send + Sync>;

struct LoggerState {
    config: LoggerConfig,
    sinks: Vec<Sink>,
    next_id: u64,
    context: LogContext,
    custom_levels: HashMap<String, CustomLevel>,
    enabled: bool,
    filter: Option<Filter>,
    sampler: Option<Arc<Sampler>>,
    log_callback: Option<LogCallback>,
    color_callback: Option<ColorCallback>,
}

impl LoggerState {
    fn allocate_id(&mut self) -> SinkId {
        let id = SinkId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn sink(&self, id: SinkId) -> Result<&Sink> {
        self.sinks
            .iter()
            .find(|sink| sink.id() == id)
            .ok_or(LoggerError::SinkNotFound(id))
    }

    /// Enabled flag and global threshold
    fn admits(&self, priority: u8) -> bool {
        self.enabled && priority >= self.config.level.priority()
    }
}

pub struct Logger {
    state: Mutex<LoggerState>,
    metrics: LoggerMetrics,
    network_stats: Arc<NetworkStats>,
}

impl Logger {
    /// Logger with the default configuration and a console sink
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoggerConfig::default())
    }

    /// Logger with `config`. A console sink is added when
    /// `config.auto_sink` is set.
    #[must_use]
    pub fn with_config(config: LoggerConfig) -> Self {
        let auto_sink = config.auto_sink;
        let mut state = LoggerState {
            config,
            sinks: Vec::new(),
            next_id: 0,
            context: LogContext::new(),
            custom_levels: HashMap::new(),
            enabled: true,
            filter: None,
            sampler: None,
            log_callback: None,
            color_callback: None,
        };

        if auto_sink {
            let id = state.allocate_id();
            state.sinks.push(Sink::with_writer(
                id,
                SinkConfig::console(),
                Box::new(ConsoleWriter::new()),
            ));
        }

        Self {
            state: Mutex::new(state),
            metrics: LoggerMetrics::new(),
            network_stats: Arc::new(NetworkStats::new()),
        }
    }

    /// # Example
    /// ```
    /// use rust_log_pipeline::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .config(LoggerConfig::default().with_auto_sink(false))
    ///     .level(LogLevel::Debug)
    ///     .bind("service", "billing")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(logger.level(), LogLevel::Debug);
    /// assert_eq!(logger.sink_count(), 0);
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    // ---- emission ----

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) -> Result<()> {
        let state = self.state.lock();
        if !state.admits(level.priority()) {
            return Ok(());
        }
        self.dispatch(&state, Record::new(level, message))
    }

    /// Log with a source location; used by the logging macros
    pub fn log_at(&self, level: LogLevel, message: impl AsRef<str>, location: Location) -> Result<()> {
        let state = self.state.lock();
        if !state.admits(level.priority()) {
            return Ok(());
        }
        self.dispatch(&state, Record::new(level, message).with_location(location))
    }

    /// Log with per-call fields. A call field wins over a bound field with
    /// the same key.
    pub fn log_with_context(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        context: LogContext,
    ) -> Result<()> {
        let state = self.state.lock();
        if !state.admits(level.priority()) {
            return Ok(());
        }
        self.dispatch(&state, Record::new(level, message).with_context(context))
    }

    /// Log at a registered custom level
    pub fn custom(&self, name: &str, message: impl AsRef<str>) -> Result<()> {
        self.custom_record(name, message, None)
    }

    pub fn custom_at(&self, name: &str, message: impl AsRef<str>, location: Location) -> Result<()> {
        self.custom_record(name, message, Some(location))
    }

    fn custom_record(
        &self,
        name: &str,
        message: impl AsRef<str>,
        location: Option<Location>,
    ) -> Result<()> {
        let state = self.state.lock();
        let level = state
            .custom_levels
            .get(name)
            .cloned()
            .ok_or_else(|| LoggerError::UnknownLevel(name.to_string()))?;
        if !state.admits(level.priority) {
            return Ok(());
        }

        let mut record = Record::custom(level, message);
        if let Some(location) = location {
            record = record.with_location(location);
        }
        self.dispatch(&state, record)
    }

    /// Filter, sampler, log callback, then every sink in order.
    ///
    /// A failing sink does not stop the fan-out. When any sink fails the
    /// result is `DeliveryFailed`; otherwise a log callback error, if any.
    fn dispatch(&self, state: &LoggerState, mut record: Record) -> Result<()> {
        record.context.merge_missing(&state.context);

        if let Some(filter) = &state.filter {
            if !filter.should_log(&record) {
                self.metrics.record_filtered();
                return Ok(());
            }
        }

        if let Some(sampler) = &state.sampler {
            if !sampler.should_sample() {
                self.metrics.record_sampled_out();
                return Ok(());
            }
        }

        let callback_result = match &state.log_callback {
            Some(callback) => callback(&record).map_err(|e| {
                self.metrics.record_callback_failure();
                eprintln!("[LOGGER ERROR] Log callback failed: {}", e);
                e
            }),
            None => Ok(()),
        };

        self.metrics.record_dispatched();

        let mut failed = 0;
        let mut first = None;
        for sink in &state.sinks {
            if let Err(e) = sink.write(&record, &state.config, state.color_callback.as_ref()) {
                self.metrics.record_sink_failure();
                eprintln!("[LOGGER ERROR] Sink #{} '{}' failed: {}", sink.id(), sink.name(), e);
                failed += 1;
                first.get_or_insert(e);
            }
        }

        match first {
            Some(first) => Err(LoggerError::delivery_failed(failed, first)),
            None => callback_result,
        }
    }

    #[inline]
    pub fn trace(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn success(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Success, message)
    }

    #[inline]
    pub fn warning(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Warning, message)
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    pub fn fail(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Fail, message)
    }

    #[inline]
    pub fn critical(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Critical, message)
    }

    /// Log a snapshot of the host as context fields
    pub fn log_system_diagnostics(&self, level: LogLevel, include_drives: bool) -> Result<()> {
        let diagnostics = SystemDiagnostics::collect(include_drives);
        self.log_with_context(
            level,
            format!("System diagnostics: {} {}", diagnostics.os, diagnostics.arch),
            diagnostics.to_context(),
        )
    }

    // ---- sinks ----

    /// Validate `config`, open its destination and append the sink
    pub fn add_sink(&self, config: SinkConfig) -> Result<SinkId> {
        let mut state = self.state.lock();
        let id = SinkId::new(state.next_id);
        let sink = Sink::open(id, config, &self.network_stats)?;
        state.next_id += 1;
        state.sinks.push(sink);
        Ok(id)
    }

    /// Append a sink backed by a caller-supplied writer
    pub fn add_sink_with_writer(
        &self,
        config: SinkConfig,
        writer: Box<dyn SinkWriter>,
    ) -> Result<SinkId> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.sinks.push(Sink::with_writer(id, config, writer));
        Ok(id)
    }

    /// Remove a sink; its buffer is flushed as it drops. Other handles
    /// stay valid.
    pub fn remove_sink(&self, id: SinkId) -> Result<()> {
        let mut state = self.state.lock();
        let index = state
            .sinks
            .iter()
            .position(|sink| sink.id() == id)
            .ok_or(LoggerError::SinkNotFound(id))?;
        state.sinks.remove(index);
        Ok(())
    }

    pub fn enable_sink(&self, id: SinkId) -> Result<()> {
        self.state.lock().sink(id)?.set_enabled(true);
        Ok(())
    }

    pub fn disable_sink(&self, id: SinkId) -> Result<()> {
        self.state.lock().sink(id)?.set_enabled(false);
        Ok(())
    }

    pub fn is_sink_enabled(&self, id: SinkId) -> Result<bool> {
        Ok(self.state.lock().sink(id)?.is_enabled())
    }

    /// Handles in registration order
    pub fn sink_ids(&self) -> Vec<SinkId> {
        self.state.lock().sinks.iter().map(Sink::id).collect()
    }

    pub fn sink_count(&self) -> usize {
        self.state.lock().sinks.len()
    }

    /// Flush every sink, attempting all of them even when one fails
    pub fn flush(&self) -> Result<()> {
        let state = self.state.lock();
        let mut failed = 0;
        let mut first = None;
        for sink in &state.sinks {
            if let Err(e) = sink.flush() {
                eprintln!("[LOGGER ERROR] Sink #{} '{}' flush failed: {}", sink.id(), sink.name(), e);
                failed += 1;
                first.get_or_insert(e);
            }
        }
        match first {
            Some(first) => Err(LoggerError::delivery_failed(failed, first)),
            None => Ok(()),
        }
    }

    // ---- bound context ----

    /// Attach a field to every subsequent record. Rebinding a key replaces
    /// its value.
    pub fn bind(&self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.state.lock().context.add_field(key, value);
    }

    pub fn unbind(&self, key: &str) -> Option<FieldValue> {
        self.state.lock().context.remove(key)
    }

    pub fn clear_bindings(&self) {
        self.state.lock().context.clear();
    }

    pub fn bindings(&self) -> LogContext {
        self.state.lock().context.clone()
    }

    // ---- custom levels ----

    /// Register a level, replacing any level with the same name
    pub fn add_custom_level(&self, level: CustomLevel) {
        self.state
            .lock()
            .custom_levels
            .insert(level.name.clone(), level);
    }

    pub fn remove_custom_level(&self, name: &str) -> Option<CustomLevel> {
        self.state.lock().custom_levels.remove(name)
    }

    pub fn custom_level(&self, name: &str) -> Option<CustomLevel> {
        self.state.lock().custom_levels.get(name).cloned()
    }

    // ---- switches, stages, hooks ----

    pub fn enable(&self) {
        self.state.lock().enabled = true;
    }

    pub fn disable(&self) {
        self.state.lock().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn set_filter(&self, filter: Filter) {
        self.state.lock().filter = Some(filter);
    }

    pub fn clear_filter(&self) {
        self.state.lock().filter = None;
    }

    /// Install a sampler. Its observer, if any, runs under the logger lock
    /// and must not log through this logger.
    pub fn set_sampler(&self, sampler: Arc<Sampler>) {
        self.state.lock().sampler = Some(sampler);
    }

    pub fn clear_sampler(&self) {
        self.state.lock().sampler = None;
    }

    pub fn sampler(&self) -> Option<Arc<Sampler>> {
        self.state.lock().sampler.clone()
    }

    pub fn set_log_callback(&self, callback: LogCallback) {
        self.state.lock().log_callback = Some(callback);
    }

    pub fn clear_log_callback(&self) {
        self.state.lock().log_callback = None;
    }

    pub fn set_color_callback(&self, callback: ColorCallback) {
        self.state.lock().color_callback = Some(callback);
    }

    pub fn clear_color_callback(&self) {
        self.state.lock().color_callback = None;
    }

    // ---- configuration ----

    pub fn set_level(&self, level: LogLevel) {
        self.state.lock().config.level = level;
    }

    pub fn level(&self) -> LogLevel {
        self.state.lock().config.level
    }

    /// Replace the global configuration. Existing sinks are kept;
    /// `auto_sink` only matters at construction.
    pub fn configure(&self, config: LoggerConfig) {
        self.state.lock().config = config;
    }

    pub fn config(&self) -> LoggerConfig {
        self.state.lock().config.clone()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Counters shared by every network sink of this logger
    pub fn network_stats(&self) -> Arc<NetworkStats> {
        Arc::clone(&self.network_stats)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Logger")
            .field("level", &state.config.level)
            .field("enabled", &state.enabled)
            .field("sinks", &state.sinks)
            .field("bindings", &state.context.len())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for sink in &state.sinks {
            if let Err(e) = sink.flush() {
                eprintln!("[LOGGER ERROR] Failed to flush sink '{}' during shutdown: {}", sink.name(), e);
            }
        }

        let failures = self.metrics.sink_failure_count();
        if failures > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down after {} failed sink writes",
                failures
            );
        }
    }
}

/// Builder for a fully configured [`Logger`]
pub struct LoggerBuilder {
    config: LoggerConfig,
    level: Option<LogLevel>,
    sinks: Vec<SinkConfig>,
    writers: Vec<(SinkConfig, Box<dyn SinkWriter>)>,
    filter: Option<Filter>,
    sampler: Option<Arc<Sampler>>,
    bindings: LogContext,
    custom_levels: Vec<CustomLevel>,
    log_callback: Option<LogCallback>,
    color_callback: Option<ColorCallback>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            level: None,
            sinks: Vec::new(),
            writers: Vec::new(),
            filter: None,
            sampler: None,
            bindings: LogContext::new(),
            custom_levels: Vec::new(),
            log_callback: None,
            color_callback: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Global threshold; overrides the level in `config`
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, config: SinkConfig) -> Self {
        self.sinks.push(config);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn writer(mut self, config: SinkConfig, writer: Box<dyn SinkWriter>) -> Self {
        self.writers.push((config, writer));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sampler(mut self, sampler: Arc<Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.bindings.add_field(key, value);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn custom_level(mut self, level: CustomLevel) -> Self {
        self.custom_levels.push(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_callback(mut self, callback: LogCallback) -> Self {
        self.log_callback = Some(callback);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn color_callback(mut self, callback: ColorCallback) -> Self {
        self.color_callback = Some(callback);
        self
    }

    /// Build the logger; fails on the first sink that cannot be opened
    pub fn build(self) -> Result<Logger> {
        let mut config = self.config;
        if let Some(level) = self.level {
            config.level = level;
        }

        let logger = Logger::with_config(config);
        for sink in self.sinks {
            logger.add_sink(sink)?;
        }
        for (config, writer) in self.writers {
            logger.add_sink_with_writer(config, writer)?;
        }

        {
            let mut state = logger.state.lock();
            state.context = self.bindings;
            state.filter = self.filter;
            state.sampler = self.sampler;
            state.log_callback = self.log_callback;
            state.color_callback = self.color_callback;
            for level in self.custom_levels {
                state.custom_levels.insert(level.name.clone(), level);
            }
        }

        Ok(logger)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

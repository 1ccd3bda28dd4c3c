//! Rule-based record admission
//!
//! A [`Filter`] holds an ordered list of [`FilterRule`]s. Each rule tests one
//! attribute of a record (level, module, message) and carries an action:
//!
//! - [`FilterAction::Allow`]: the record is rejected when the test fails
//! - [`FilterAction::Deny`]: the record is rejected when the test succeeds
//!
//! Rules run in insertion order and evaluation stops at the first rejection,
//! so a later rule can never re-admit a record an earlier rule rejected.
//! An empty filter admits everything.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::{Filter, FilterAction, LogLevel, Record};
//!
//! let filter = Filter::new()
//!     .with_min_level(LogLevel::Info)
//!     .with_message_contains("healthcheck", FilterAction::Deny);
//!
//! assert!(filter.should_log(&Record::new(LogLevel::Warning, "disk almost full")));
//! assert!(!filter.should_log(&Record::new(LogLevel::Info, "GET /healthcheck 200")));
//! assert!(!filter.should_log(&Record::new(LogLevel::Debug, "cache miss")));
//! ```

use super::log_level::LogLevel;
use super::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Predicate type for [`RuleKind::Custom`]
pub type RecordPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    #[default]
    Allow,
    Deny,
}

/// The attribute test performed by a rule.
///
/// Level thresholds are stored as priorities so custom levels can be used
/// as thresholds too.
#[derive(Clone)]
pub enum RuleKind {
    /// Record priority >= threshold
    MinPriority(u8),
    /// Record priority <= threshold
    MaxPriority(u8),
    /// Record priority == threshold
    ExactPriority(u8),
    /// Record module equals the pattern
    ModuleExact(String),
    /// Record module starts with the pattern
    ModulePrefix(String),
    /// Record message contains the pattern
    MessageContains(String),
    /// Arbitrary predicate over the record
    Custom(RecordPredicate),
}

impl RuleKind {
    /// Whether the record satisfies this test.
    ///
    /// Module tests never match a record without a module.
    fn matches(&self, record: &Record) -> bool {
        match self {
            RuleKind::MinPriority(threshold) => record.priority() >= *threshold,
            RuleKind::MaxPriority(threshold) => record.priority() <= *threshold,
            RuleKind::ExactPriority(threshold) => record.priority() == *threshold,
            RuleKind::ModuleExact(pattern) => record.module.as_deref() == Some(pattern.as_str()),
            RuleKind::ModulePrefix(pattern) => record
                .module
                .as_deref()
                .is_some_and(|module| module.starts_with(pattern.as_str())),
            RuleKind::MessageContains(pattern) => record.message.contains(pattern.as_str()),
            RuleKind::Custom(predicate) => predicate(record),
        }
    }
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::MinPriority(p) => f.debug_tuple("MinPriority").field(p).finish(),
            RuleKind::MaxPriority(p) => f.debug_tuple("MaxPriority").field(p).finish(),
            RuleKind::ExactPriority(p) => f.debug_tuple("ExactPriority").field(p).finish(),
            RuleKind::ModuleExact(s) => f.debug_tuple("ModuleExact").field(s).finish(),
            RuleKind::ModulePrefix(s) => f.debug_tuple("ModulePrefix").field(s).finish(),
            RuleKind::MessageContains(s) => f.debug_tuple("MessageContains").field(s).finish(),
            RuleKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One admission rule
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub kind: RuleKind,
    pub action: FilterAction,
}

impl FilterRule {
    pub fn new(kind: RuleKind, action: FilterAction) -> Self {
        Self { kind, action }
    }

    pub fn min_level(level: LogLevel) -> Self {
        Self::new(RuleKind::MinPriority(level.priority()), FilterAction::Allow)
    }

    pub fn max_level(level: LogLevel) -> Self {
        Self::new(RuleKind::MaxPriority(level.priority()), FilterAction::Allow)
    }

    pub fn exact_level(level: LogLevel) -> Self {
        Self::new(RuleKind::ExactPriority(level.priority()), FilterAction::Allow)
    }

    pub fn module_exact(module: impl Into<String>, action: FilterAction) -> Self {
        Self::new(RuleKind::ModuleExact(module.into()), action)
    }

    pub fn module_prefix(prefix: impl Into<String>, action: FilterAction) -> Self {
        Self::new(RuleKind::ModulePrefix(prefix.into()), action)
    }

    pub fn message_contains(pattern: impl Into<String>, action: FilterAction) -> Self {
        Self::new(RuleKind::MessageContains(pattern.into()), action)
    }

    pub fn custom<F>(predicate: F, action: FilterAction) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self::new(RuleKind::Custom(Arc::new(predicate)), action)
    }

    /// Whether this rule rejects the record
    #[inline]
    fn rejects(&self, record: &Record) -> bool {
        let matched = self.kind.matches(record);
        match self.action {
            FilterAction::Allow => !matched,
            FilterAction::Deny => matched,
        }
    }
}

/// Ordered, short-circuiting rule list
#[derive(Debug, Clone, Default)]
pub struct Filter {
    rules: Vec<FilterRule>,
}

impl Filter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: FilterRule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.add_rule(rule);
        self
    }

    #[must_use]
    pub fn with_min_level(self, level: LogLevel) -> Self {
        self.with_rule(FilterRule::min_level(level))
    }

    #[must_use]
    pub fn with_max_level(self, level: LogLevel) -> Self {
        self.with_rule(FilterRule::max_level(level))
    }

    #[must_use]
    pub fn with_exact_level(self, level: LogLevel) -> Self {
        self.with_rule(FilterRule::exact_level(level))
    }

    #[must_use]
    pub fn with_module_exact(self, module: impl Into<String>, action: FilterAction) -> Self {
        self.with_rule(FilterRule::module_exact(module, action))
    }

    #[must_use]
    pub fn with_module_prefix(self, prefix: impl Into<String>, action: FilterAction) -> Self {
        self.with_rule(FilterRule::module_prefix(prefix, action))
    }

    #[must_use]
    pub fn with_message_contains(self, pattern: impl Into<String>, action: FilterAction) -> Self {
        self.with_rule(FilterRule::message_contains(pattern, action))
    }

    /// Decide whether a record is admitted
    pub fn should_log(&self, record: &Record) -> bool {
        !self.rules.iter().any(|rule| rule.rejects(record))
    }

    /// Remove every rule
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

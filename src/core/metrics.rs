//! Pipeline and transport counters
//!
//! Every stage that can drop or fail a record bumps one counter here, so the
//! logger's admission decisions are observable without parsing its output.
//! Counters are independent, so relaxed ordering is enough.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one logger's dispatch path
///
/// # Example
///
/// ```
/// use rust_log_pipeline::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.dispatched_count(), 1);
/// assert_eq!(metrics.filtered_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records that reached the fan-out
    dispatched: AtomicU64,

    /// Records rejected by the logger-level filter
    filtered: AtomicU64,

    /// Records rejected by the sampler
    sampled_out: AtomicU64,

    /// Individual sink writes that failed
    sink_failures: AtomicU64,

    /// Log callback invocations that failed
    callback_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sampled_out_count(&self) -> u64 {
        self.sampled_out.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failure_count(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn callback_failure_count(&self) -> u64 {
        self.callback_failures.load(Ordering::Relaxed)
    }

    /// Returns the previous value, like the other `record_*` methods
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sampled_out(&self) -> u64 {
        self.sampled_out.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_callback_failure(&self) -> u64 {
        self.callback_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of admitted-or-rejected records that were dropped by the
    /// filter or the sampler, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let dropped = (self.filtered_count() + self.sampled_out_count()) as f64;
        let total = self.dispatched_count() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.sampled_out.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.callback_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched_count()),
            filtered: AtomicU64::new(self.filtered_count()),
            sampled_out: AtomicU64::new(self.sampled_out_count()),
            sink_failures: AtomicU64::new(self.sink_failure_count()),
            callback_failures: AtomicU64::new(self.callback_failure_count()),
        }
    }
}

/// Transport counters shared by every network writer of one logger
#[derive(Debug, Default)]
pub struct NetworkStats {
    messages_sent: AtomicU64,
    bytes_sent: AtomicU64,
    send_errors: AtomicU64,
    reconnects: AtomicU64,
}

impl NetworkStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.messages_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.send_errors.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_returns_previous() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_sink_failure(), 0);
        assert_eq!(metrics.record_sink_failure(), 1);
        assert_eq!(metrics.sink_failure_count(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..75 {
            metrics.record_dispatched();
        }
        for _ in 0..15 {
            metrics.record_filtered();
        }
        for _ in 0..10 {
            metrics.record_sampled_out();
        }
        assert!((metrics.drop_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let metrics = LoggerMetrics::new();
        metrics.record_dispatched();
        metrics.record_callback_failure();

        let snapshot = metrics.clone();
        metrics.record_dispatched();
        metrics.reset();

        assert_eq!(snapshot.dispatched_count(), 1);
        assert_eq!(snapshot.callback_failure_count(), 1);
        assert_eq!(metrics.dispatched_count(), 0);
    }

    #[test]
    fn test_network_stats() {
        let stats = NetworkStats::new();
        stats.record_sent(10);
        stats.record_sent(5);
        stats.record_error();
        stats.record_reconnect();

        assert_eq!(stats.messages_sent(), 2);
        assert_eq!(stats.bytes_sent(), 15);
        assert_eq!(stats.send_errors(), 1);
        assert_eq!(stats.reconnects(), 1);

        stats.reset();
        assert_eq!(stats.bytes_sent(), 0);
    }
}

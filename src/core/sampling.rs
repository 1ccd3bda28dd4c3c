//! Log sampling for high-volume scenarios
//!
//! A [`Sampler`] is an admission stage independent of filtering: it decides
//! per record whether to keep it, using one of five strategies.
//!
//! # Strategies
//!
//! - **None**: keep everything
//! - **Probability**: keep each record with probability `p`
//! - **RateLimit**: keep at most `max_records` per window of `window_ms`
//! - **EveryN**: keep the Nth, 2Nth, 3Nth... record
//! - **Adaptive**: random sampling whose rate is nudged toward a target
//!   throughput once per adjustment interval
//!
//! # Thread Safety
//!
//! Strategy state sits behind one mutex, and the decision is made in the same
//! critical section that updates it. Counters are atomics updated after the
//! lock is released, and observer callbacks also run after release, so an
//! observer may call back into the sampler without deadlocking.
//!
//! # Example
//!
//! ```
//! use rust_log_pipeline::{Sampler, SamplingStrategy};
//!
//! let sampler = Sampler::new(SamplingStrategy::EveryN(10));
//! let kept = (0..20).filter(|_| sampler.should_sample()).count();
//! assert_eq!(kept, 2);
//! ```

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sampling strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Keep every record
    None,

    /// Keep each record with the given probability (clamped to 0.0..=1.0)
    Probability(f64),

    /// Keep at most `max_records` per window; the window resets lazily on
    /// the first call after it has elapsed
    RateLimit { max_records: u32, window_ms: u64 },

    /// Keep every Nth record (N = 0 is treated as 1)
    EveryN(u32),

    /// Random sampling with a self-adjusting rate.
    ///
    /// Once per `adjustment_interval_ms` the observed throughput is compared
    /// to `target_rate` (records per second). Above target the rate is
    /// multiplied by 0.9, otherwise by 1.1, clamped to `min_rate..=max_rate`.
    Adaptive {
        target_rate: f64,
        min_rate: f64,
        max_rate: f64,
        adjustment_interval_ms: u64,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::None
    }
}

impl SamplingStrategy {
    /// Clamp out-of-range parameters into their valid domain
    fn normalized(self) -> Self {
        match self {
            SamplingStrategy::Probability(p) => SamplingStrategy::Probability(p.clamp(0.0, 1.0)),
            SamplingStrategy::RateLimit {
                max_records,
                window_ms,
            } => SamplingStrategy::RateLimit {
                max_records,
                window_ms: window_ms.max(1),
            },
            SamplingStrategy::EveryN(n) => SamplingStrategy::EveryN(n.max(1)),
            SamplingStrategy::Adaptive {
                target_rate,
                min_rate,
                max_rate,
                adjustment_interval_ms,
            } => {
                let min_rate = min_rate.clamp(0.0, 1.0);
                SamplingStrategy::Adaptive {
                    target_rate: target_rate.max(0.0),
                    min_rate,
                    max_rate: max_rate.clamp(min_rate, 1.0),
                    adjustment_interval_ms: adjustment_interval_ms.max(1),
                }
            }
            other => other,
        }
    }
}

/// Notifications emitted by a [`Sampler`].
///
/// Every method has an empty default, so implementors only override what
/// they care about. Callbacks run after the sampler's lock is released.
///
/// A sampler installed on a [`Logger`](crate::Logger) is consulted while the
/// logger lock is held, so an observer must not log through that logger.
pub trait SamplerObserver: Send + Sync {
    fn on_accept(&self, _rate: f64) {}

    fn on_reject(&self, _rate: f64) {}

    /// The rate-limit window is full; `window_count` records already kept
    fn on_rate_limit_exceeded(&self, _window_count: u32, _max_records: u32) {}

    /// The adaptive rate changed at the end of an adjustment interval
    fn on_rate_adjusted(&self, _old_rate: f64, _new_rate: f64, _observed_rate: f64) {}
}

/// Metrics for sampling observability
///
/// # Example
///
/// ```
/// use rust_log_pipeline::SamplerMetrics;
///
/// let metrics = SamplerMetrics::new();
/// assert_eq!(metrics.accepted_count(), 0);
/// assert_eq!(metrics.rejected_count(), 0);
/// ```
#[derive(Debug)]
pub struct SamplerMetrics {
    total_count: AtomicU64,
    accepted_count: AtomicU64,
    rejected_count: AtomicU64,
    rate_limit_exceeded: AtomicU64,
    rate_adjustments: AtomicU64,
}

impl SamplerMetrics {
    /// Create new metrics with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_count: AtomicU64::new(0),
            accepted_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            rate_limit_exceeded: AtomicU64::new(0),
            rate_adjustments: AtomicU64::new(0),
        }
    }

    /// Total number of sampling decisions
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn accepted_count(&self) -> u64 {
        self.accepted_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Number of rejections caused by a full rate-limit window
    #[inline]
    pub fn rate_limit_exceeded_count(&self) -> u64 {
        self.rate_limit_exceeded.load(Ordering::Relaxed)
    }

    /// Number of adaptive rate adjustments
    #[inline]
    pub fn rate_adjustment_count(&self) -> u64 {
        self.rate_adjustments.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_accepted(&self) {
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rejected(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rate_limit_exceeded(&self) {
        self.rate_limit_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rate_adjustment(&self) {
        self.rate_adjustments.fetch_add(1, Ordering::Relaxed);
    }

    /// Observed accept ratio; 1.0 before any decision
    pub fn accept_rate(&self) -> f64 {
        let total = self.total_count() as f64;
        if total == 0.0 {
            1.0
        } else {
            self.accepted_count() as f64 / total
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.total_count.store(0, Ordering::Relaxed);
        self.accepted_count.store(0, Ordering::Relaxed);
        self.rejected_count.store(0, Ordering::Relaxed);
        self.rate_limit_exceeded.store(0, Ordering::Relaxed);
        self.rate_adjustments.store(0, Ordering::Relaxed);
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SamplerMetrics {
    /// Snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            total_count: AtomicU64::new(self.total_count()),
            accepted_count: AtomicU64::new(self.accepted_count()),
            rejected_count: AtomicU64::new(self.rejected_count()),
            rate_limit_exceeded: AtomicU64::new(self.rate_limit_exceeded_count()),
            rate_adjustments: AtomicU64::new(self.rate_adjustment_count()),
        }
    }
}

/// Mutable strategy state, guarded by the sampler's mutex
#[derive(Debug)]
struct SamplerState {
    /// Monotonic call counter (every-N)
    counter: u64,
    /// Rate-limit window
    window_start: Instant,
    window_count: u32,
    /// Adaptive acceptance probability
    current_rate: f64,
    last_adjustment: Instant,
    adaptive_count: u64,
    rng: StdRng,
}

impl SamplerState {
    fn new(now: Instant, rng: StdRng) -> Self {
        Self {
            counter: 0,
            window_start: now,
            window_count: 0,
            current_rate: 1.0,
            last_adjustment: now,
            adaptive_count: 0,
            rng,
        }
    }
}

/// What happened inside one critical section, replayed after unlock
struct Decision {
    accepted: bool,
    rate: f64,
    rate_limit_exceeded: Option<(u32, u32)>,
    adjustment: Option<(f64, f64, f64)>,
}

impl Decision {
    fn plain(accepted: bool, rate: f64) -> Self {
        Self {
            accepted,
            rate,
            rate_limit_exceeded: None,
            adjustment: None,
        }
    }
}

/// Thread-safe sampler
pub struct Sampler {
    strategy: SamplingStrategy,
    state: Mutex<SamplerState>,
    metrics: SamplerMetrics,
    observer: Option<Arc<dyn SamplerObserver>>,
}

impl Sampler {
    /// Create a sampler with an entropy-seeded generator
    pub fn new(strategy: SamplingStrategy) -> Self {
        Self::from_rng(strategy, StdRng::from_entropy())
    }

    /// Create a sampler with a fixed seed, for reproducible decisions
    pub fn with_seed(strategy: SamplingStrategy, seed: u64) -> Self {
        Self::from_rng(strategy, StdRng::seed_from_u64(seed))
    }

    fn from_rng(strategy: SamplingStrategy, rng: StdRng) -> Self {
        Self {
            strategy: strategy.normalized(),
            state: Mutex::new(SamplerState::new(Instant::now(), rng)),
            metrics: SamplerMetrics::new(),
            observer: None,
        }
    }

    /// Attach an observer for accept/reject/limit/adjustment notifications
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SamplerObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Decide whether the next record is kept
    pub fn should_sample(&self) -> bool {
        self.should_sample_at(Instant::now())
    }

    pub(crate) fn should_sample_at(&self, now: Instant) -> bool {
        let decision = {
            let mut state = self.state.lock();
            self.decide(&mut state, now)
        };

        if decision.accepted {
            self.metrics.record_accepted();
        } else {
            self.metrics.record_rejected();
        }
        if decision.rate_limit_exceeded.is_some() {
            self.metrics.record_rate_limit_exceeded();
        }
        if decision.adjustment.is_some() {
            self.metrics.record_rate_adjustment();
        }

        if let Some(observer) = &self.observer {
            if let Some((old, new, observed)) = decision.adjustment {
                observer.on_rate_adjusted(old, new, observed);
            }
            if let Some((count, max)) = decision.rate_limit_exceeded {
                observer.on_rate_limit_exceeded(count, max);
            }
            if decision.accepted {
                observer.on_accept(decision.rate);
            } else {
                observer.on_reject(decision.rate);
            }
        }

        decision.accepted
    }

    /// Strategy logic; runs with the state lock held
    fn decide(&self, state: &mut SamplerState, now: Instant) -> Decision {
        match self.strategy {
            SamplingStrategy::None => Decision::plain(true, 1.0),

            SamplingStrategy::Probability(p) => {
                let accepted = p >= 1.0 || (p > 0.0 && state.rng.gen::<f64>() < p);
                Decision::plain(accepted, p)
            }

            SamplingStrategy::RateLimit {
                max_records,
                window_ms,
            } => {
                if now.saturating_duration_since(state.window_start)
                    >= Duration::from_millis(window_ms)
                {
                    state.window_start = now;
                    state.window_count = 0;
                }

                if state.window_count < max_records {
                    state.window_count += 1;
                    Decision::plain(true, 1.0)
                } else {
                    let mut decision = Decision::plain(false, 0.0);
                    decision.rate_limit_exceeded = Some((state.window_count, max_records));
                    decision
                }
            }

            SamplingStrategy::EveryN(n) => {
                state.counter += 1;
                Decision::plain(state.counter % u64::from(n) == 0, 1.0 / f64::from(n))
            }

            SamplingStrategy::Adaptive {
                target_rate,
                min_rate,
                max_rate,
                adjustment_interval_ms,
            } => {
                let mut adjustment = None;
                if now.saturating_duration_since(state.last_adjustment)
                    >= Duration::from_millis(adjustment_interval_ms)
                {
                    let interval_secs = adjustment_interval_ms as f64 / 1000.0;
                    let observed = state.adaptive_count as f64 / interval_secs;
                    let old = state.current_rate;
                    let new = if observed > target_rate {
                        (old * 0.9).max(min_rate)
                    } else {
                        (old * 1.1).min(max_rate)
                    };
                    state.current_rate = new;
                    state.adaptive_count = 0;
                    state.last_adjustment = now;
                    adjustment = Some((old, new, observed));
                }

                state.adaptive_count += 1;
                let rate = state.current_rate;
                let accepted = state.rng.gen::<f64>() < rate;
                Decision {
                    accepted,
                    rate,
                    rate_limit_exceeded: None,
                    adjustment,
                }
            }
        }
    }

    /// Current effective acceptance rate of the strategy
    pub fn current_rate(&self) -> f64 {
        match self.strategy {
            SamplingStrategy::None => 1.0,
            SamplingStrategy::Probability(p) => p,
            SamplingStrategy::EveryN(n) => 1.0 / f64::from(n),
            SamplingStrategy::RateLimit { max_records, .. } => {
                if self.state.lock().window_count < max_records {
                    1.0
                } else {
                    0.0
                }
            }
            SamplingStrategy::Adaptive { .. } => self.state.lock().current_rate,
        }
    }

    /// Reset strategy state and counters; the generator keeps its sequence
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            let now = Instant::now();
            state.counter = 0;
            state.window_start = now;
            state.window_count = 0;
            state.current_rate = 1.0;
            state.last_adjustment = now;
            state.adaptive_count = 0;
        }
        self.metrics.reset();
    }

    pub fn strategy(&self) -> &SamplingStrategy {
        &self.strategy
    }

    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("strategy", &self.strategy)
            .field("metrics", &self.metrics)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::accumulator::Accumulator;
use crate::error::MetricError;
use crate::time::TimeProvider;

/// Total retention of the sliding window.
pub const MAX_AGE: Duration = Duration::from_secs(600);
/// Number of staggered buckets the retention is divided into.
pub const WINDOW_COUNT: usize = 5;
/// Rotation granularity; also the precision slack of the window.
pub const WINDOW_INTERVAL: Duration = Duration::from_secs(MAX_AGE.as_secs() / WINDOW_COUNT as u64);

/// Ring of accumulators staggered in age. Every observation is broadcast to
/// all buckets, so the oldest bucket always covers the full retention period
/// and can be read directly, without merging sketches. Expired buckets are
/// replaced lazily on the next record or read.
pub struct RotatingBucketSet<A> {
    buckets: Vec<A>,
    head: usize,
    head_expires_at: Instant,
    interval: Duration,
    factory: Arc<dyn Fn() -> A + Send + Sync>,
    clock: Arc<dyn TimeProvider>,
}

impl<A: Accumulator> RotatingBucketSet<A> {
    /// Ring with the default sizing: five buckets over ten minutes.
    pub fn new<F>(factory: F, clock: Arc<dyn TimeProvider>) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::build(Arc::new(factory), clock, WINDOW_COUNT, WINDOW_INTERVAL)
    }

    /// Ring with custom sizing. `max_age` must be long enough to give each
    /// bucket a non-zero interval.
    pub fn with_window<F>(
        factory: F,
        clock: Arc<dyn TimeProvider>,
        window_count: NonZeroUsize,
        max_age: Duration,
    ) -> Result<Self, MetricError>
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        let count = window_count.get();
        let interval = u32::try_from(count)
            .ok()
            .map(|divisor| max_age / divisor)
            .filter(|interval| !interval.is_zero())
            .ok_or(MetricError::InvalidWindow {
                max_age,
                window_count: count,
            })?;
        Ok(Self::build(Arc::new(factory), clock, count, interval))
    }

    pub(crate) fn from_shared(
        factory: Arc<dyn Fn() -> A + Send + Sync>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self::build(factory, clock, WINDOW_COUNT, WINDOW_INTERVAL)
    }

    fn build(
        factory: Arc<dyn Fn() -> A + Send + Sync>,
        clock: Arc<dyn TimeProvider>,
        window_count: usize,
        interval: Duration,
    ) -> Self {
        let buckets = (0..window_count).map(|_| factory()).collect();
        let head_expires_at = clock.now() + interval;
        Self {
            buckets,
            head: 0,
            head_expires_at,
            interval,
            factory,
            clock,
        }
    }

    /// Record one observation into every live bucket. Returns the value for
    /// chaining.
    pub fn record(&mut self, value: f64) -> f64 {
        self.rotate();
        for bucket in &mut self.buckets {
            bucket.ingest(value);
        }
        value
    }

    /// The oldest live bucket, covering the full retention period.
    pub fn head(&mut self) -> &A {
        self.rotate();
        &self.buckets[self.head]
    }

    pub fn window_interval(&self) -> Duration {
        self.interval
    }

    /// Replace every bucket whose window has elapsed since the last call and
    /// advance the expiry to the next boundary of the grid fixed at
    /// construction time. A clock that ran backwards rotates nothing.
    fn rotate(&mut self) {
        let now = self.clock.now();
        let elapsed = match now.checked_duration_since(self.head_expires_at) {
            Some(elapsed) if !elapsed.is_zero() => elapsed,
            _ => return,
        };
        // Full-precision arithmetic: truncating the elapsed time would let a
        // sub-nanosecond overshoot past a boundary skip a due rotation.
        let interval_ns = self.interval.as_nanos().max(1);
        let elapsed_ns = elapsed.as_nanos();
        let due = (elapsed_ns + interval_ns - 1) / interval_ns;
        let expired = due.min(self.buckets.len() as u128) as usize;
        for _ in 0..expired {
            self.buckets[self.head] = (self.factory)();
            self.head = (self.head + 1) % self.buckets.len();
        }
        if expired == self.buckets.len() {
            debug!(
                target = "metrics",
                expired, "entire window ring expired while idle"
            );
        }
        // First grid boundary strictly after `now`; when the elapsed time is
        // an exact multiple of the interval this lands one full interval out.
        let steps = elapsed_ns / interval_ns + 1;
        let advance_ns = u64::try_from(steps.saturating_mul(interval_ns)).unwrap_or(u64::MAX);
        self.head_expires_at = self
            .head_expires_at
            .checked_add(Duration::from_nanos(advance_ns))
            .unwrap_or_else(|| now + self.interval);
    }
}

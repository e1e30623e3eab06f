use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic time for window rotation. Production code uses
/// [`SystemTimeProvider`]; tests freeze and advance a [`ManualTimeProvider`].
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock whose reported time is a base instant plus a settable nanosecond
/// offset. Moving the offset backwards simulates a wall-clock adjustment.
pub struct ManualTimeProvider {
    base: Instant,
    offset_ns: AtomicU64,
}

impl ManualTimeProvider {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ns: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.offset_ns
            .fetch_add(nanos_to_u64(duration), Ordering::Relaxed);
    }

    pub fn set(&self, duration: Duration) {
        self.offset_ns
            .store(nanos_to_u64(duration), Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.offset_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for ManualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Instant {
        let nanos = self.offset_ns.load(Ordering::Relaxed);
        self.base
            .checked_add(Duration::from_nanos(nanos))
            .unwrap_or(self.base)
    }
}

fn nanos_to_u64(duration: Duration) -> u64 {
    let nanos = duration.as_nanos();
    if nanos > u128::from(u64::MAX) {
        u64::MAX
    } else {
        nanos as u64
    }
}

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::accumulator::{Accumulator, CkmsAccumulator};
use crate::error::MetricError;
use crate::labels::{normalize_labels, LabelKey};
use crate::time::{SystemTimeProvider, TimeProvider};
use crate::window::RotatingBucketSet;

/// Static identity of a summary metric.
#[derive(Debug, Clone, Copy)]
pub struct SummaryDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl SummaryDescriptor {
    pub const fn new(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self { name, help, labels }
    }
}

/// Point-in-time state of one summary series. `quantiles` holds one entry per
/// configured target, `None` when the window holds no observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryValue {
    pub sum: f64,
    pub count: u64,
    pub quantiles: Vec<(f64, Option<f64>)>,
}

impl SummaryValue {
    pub fn from_accumulator<A: Accumulator>(accumulator: &A) -> Self {
        let quantiles = accumulator
            .targets()
            .iter()
            .map(|target| (target.quantile, accumulator.query(target.quantile)))
            .collect();
        Self {
            sum: accumulator.sum(),
            count: accumulator.count(),
            quantiles,
        }
    }
}

/// Summary metric: one sliding-window bucket set per distinct label set.
/// Every series owns its own lock; concurrent observations on different
/// series never contend.
pub struct Summary<A: Accumulator = CkmsAccumulator> {
    descriptor: SummaryDescriptor,
    series: DashMap<LabelKey, Arc<Mutex<RotatingBucketSet<A>>>>,
    factory: Arc<dyn Fn() -> A + Send + Sync>,
    clock: Arc<dyn TimeProvider>,
}

impl Summary<CkmsAccumulator> {
    pub fn new(descriptor: SummaryDescriptor) -> Self {
        Self::with_parts(descriptor, CkmsAccumulator::new, Arc::new(SystemTimeProvider))
    }

    pub fn with_clock(descriptor: SummaryDescriptor, clock: Arc<dyn TimeProvider>) -> Self {
        Self::with_parts(descriptor, CkmsAccumulator::new, clock)
    }
}

impl<A: Accumulator> Summary<A> {
    /// Summary over a caller-supplied accumulator factory and clock. The
    /// factory is invoked once per bucket, five times per series.
    pub fn with_parts<F>(
        descriptor: SummaryDescriptor,
        factory: F,
        clock: Arc<dyn TimeProvider>,
    ) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self {
            descriptor,
            series: DashMap::new(),
            factory: Arc::new(factory),
            clock,
        }
    }

    pub fn descriptor(&self) -> SummaryDescriptor {
        self.descriptor
    }

    /// Record `value` for the series identified by `labels`, creating the
    /// series on first use. Returns the value for chaining.
    pub fn observe(
        &self,
        labels: &[(&'static str, &str)],
        value: f64,
    ) -> Result<f64, MetricError> {
        let key = normalize_labels(self.descriptor.name, self.descriptor.labels, labels)?;
        let series = match self.series.entry(key) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(vacant) => {
                debug!(
                    target = "metrics",
                    metric = self.descriptor.name,
                    "creating summary series"
                );
                let set = RotatingBucketSet::from_shared(
                    Arc::clone(&self.factory),
                    Arc::clone(&self.clock),
                );
                let arc = Arc::new(Mutex::new(set));
                vacant.insert(Arc::clone(&arc));
                arc
            }
        };
        let mut guard = series.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.record(value))
    }

    /// Current value for the series identified by `labels`. A label set that
    /// was never observed yields the empty value (sum 0, count 0, every
    /// configured quantile `None`) without creating a series.
    pub fn get(&self, labels: &[(&'static str, &str)]) -> Result<SummaryValue, MetricError> {
        let key = normalize_labels(self.descriptor.name, self.descriptor.labels, labels)?;
        let series = match self.series.get(&key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Ok(SummaryValue::from_accumulator(&(self.factory)())),
        };
        let mut guard = series.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(SummaryValue::from_accumulator(guard.head()))
    }

    /// Every live series with its label values and current value.
    pub fn values(&self) -> Vec<(Vec<String>, SummaryValue)> {
        let entries: Vec<(Vec<String>, Arc<Mutex<RotatingBucketSet<A>>>)> = self
            .series
            .iter()
            .map(|entry| (entry.key().values().to_vec(), Arc::clone(entry.value())))
            .collect();
        entries
            .into_iter()
            .map(|(labels, series)| {
                let mut guard = series.lock().unwrap_or_else(PoisonError::into_inner);
                (labels, SummaryValue::from_accumulator(guard.head()))
            })
            .collect()
    }
}

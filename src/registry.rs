use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::MetricError;
use crate::summary::{Summary, SummaryDescriptor, SummaryValue};
use crate::time::{SystemTimeProvider, TimeProvider};

static REGISTRY: OnceCell<Arc<SummaryRegistry>> = OnceCell::new();

/// Process-wide default registry.
pub fn global_registry() -> Arc<SummaryRegistry> {
    REGISTRY
        .get_or_init(|| Arc::new(SummaryRegistry::new()))
        .clone()
}

/// Named collection of summary metrics, shared by recording call sites and
/// the text encoder.
pub struct SummaryRegistry {
    summaries: DashMap<&'static str, Arc<Summary>>,
    clock: Arc<dyn TimeProvider>,
}

impl SummaryRegistry {
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    /// Registry whose summaries all rotate against the given clock.
    pub fn with_time_provider(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            summaries: DashMap::new(),
            clock,
        }
    }

    pub fn register(&self, descriptor: SummaryDescriptor) -> Result<Arc<Summary>, MetricError> {
        match self.summaries.entry(descriptor.name) {
            Entry::Occupied(_) => Err(MetricError::AlreadyRegistered(descriptor.name)),
            Entry::Vacant(vacant) => {
                debug!(
                    target = "metrics",
                    metric = descriptor.name,
                    "registering summary"
                );
                let summary = Arc::new(Summary::with_clock(descriptor, Arc::clone(&self.clock)));
                vacant.insert(Arc::clone(&summary));
                Ok(summary)
            }
        }
    }

    pub fn observe(
        &self,
        descriptor: SummaryDescriptor,
        labels: &[(&'static str, &str)],
        value: f64,
    ) -> Result<f64, MetricError> {
        let summary = self
            .summaries
            .get(descriptor.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MetricError::NotRegistered(descriptor.name))?;
        summary.observe(labels, value)
    }

    pub fn get(
        &self,
        descriptor: SummaryDescriptor,
        labels: &[(&'static str, &str)],
    ) -> Result<SummaryValue, MetricError> {
        let summary = self
            .summaries
            .get(descriptor.name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(MetricError::NotRegistered(descriptor.name))?;
        summary.get(labels)
    }

    /// All registered summaries, ordered by name for stable exposition.
    pub fn summaries(&self) -> Vec<Arc<Summary>> {
        let mut all: Vec<Arc<Summary>> = self
            .summaries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by_key(|summary| summary.descriptor().name);
        all
    }
}

impl Default for SummaryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

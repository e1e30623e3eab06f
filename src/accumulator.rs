use quantiles::ckms::CKMS;

use crate::error::MetricError;

/// One quantile the estimator is configured to answer, with the approximation
/// tolerance promised for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileTarget {
    pub quantile: f64,
    pub error: f64,
}

impl QuantileTarget {
    pub const fn new(quantile: f64, error: f64) -> Self {
        Self { quantile, error }
    }
}

/// Targets used when none are supplied: p50, p90 and p99 with progressively
/// tighter error bounds.
pub const DEFAULT_TARGETS: &[QuantileTarget] = &[
    QuantileTarget::new(0.5, 0.05),
    QuantileTarget::new(0.9, 0.01),
    QuantileTarget::new(0.99, 0.001),
];

/// Capability contract for the delegated point-in-time estimator. The window
/// machinery only ever feeds values in and asks for sum, count and quantiles;
/// it makes no assumption about the sketch behind the answers.
pub trait Accumulator: Send + 'static {
    /// Record one observation.
    fn ingest(&mut self, value: f64);
    /// Sum of all values ingested since this accumulator was created.
    fn sum(&self) -> f64;
    /// Number of values ingested since this accumulator was created.
    fn count(&self) -> u64;
    /// The quantiles this accumulator answers, with their error bounds.
    fn targets(&self) -> &[QuantileTarget];
    /// Estimate for `quantile`, or `None` when nothing has been ingested.
    fn query(&self, quantile: f64) -> Option<f64>;
}

/// Default accumulator backed by the CKMS biased-quantile sketch. The sketch
/// takes a single error factor, so it is built with the tightest bound among
/// the configured targets. The running sum is tracked outside the sketch,
/// which compresses samples and cannot reproduce it exactly.
#[derive(Debug, Clone)]
pub struct CkmsAccumulator {
    sketch: CKMS<f64>,
    sum: f64,
    targets: Vec<QuantileTarget>,
}

impl CkmsAccumulator {
    pub fn new() -> Self {
        Self {
            sketch: CKMS::new(tightest_error(DEFAULT_TARGETS)),
            sum: 0.0,
            targets: DEFAULT_TARGETS.to_vec(),
        }
    }

    pub fn with_targets(targets: Vec<QuantileTarget>) -> Result<Self, MetricError> {
        for target in &targets {
            if !(target.quantile > 0.0 && target.quantile < 1.0) {
                return Err(MetricError::InvalidQuantile(target.quantile));
            }
            if !(target.error > 0.0 && target.error < 1.0) {
                return Err(MetricError::InvalidErrorBound(target.error));
            }
        }
        let sketch = CKMS::new(tightest_error(&targets));
        Ok(Self {
            sketch,
            sum: 0.0,
            targets,
        })
    }
}

impl Default for CkmsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for CkmsAccumulator {
    fn ingest(&mut self, value: f64) {
        self.sum += value;
        self.sketch.insert(value);
    }

    fn sum(&self) -> f64 {
        self.sum
    }

    fn count(&self) -> u64 {
        self.sketch.count() as u64
    }

    fn targets(&self) -> &[QuantileTarget] {
        &self.targets
    }

    fn query(&self, quantile: f64) -> Option<f64> {
        if self.sketch.count() == 0 {
            return None;
        }
        self.sketch.query(quantile).map(|(_, value)| value)
    }
}

fn tightest_error(targets: &[QuantileTarget]) -> f64 {
    targets
        .iter()
        .map(|t| t.error)
        .reduce(f64::min)
        .unwrap_or(0.001)
}

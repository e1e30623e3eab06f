use std::sync::Arc;
use std::time::Duration;

use sliding_summary::{
    encode_text, Accumulator, ManualTimeProvider, QuantileTarget, Summary, SummaryDescriptor,
    SummaryRegistry, MAX_AGE, WINDOW_COUNT, WINDOW_INTERVAL,
};

const BAR: SummaryDescriptor = SummaryDescriptor::new("bar", "bar description", &["foo"]);

/// Estimator that keeps every sample and answers quantiles by nearest rank,
/// so window behavior can be asserted against exact values.
struct ExactAccumulator {
    samples: Vec<f64>,
    targets: Vec<QuantileTarget>,
}

impl ExactAccumulator {
    fn new() -> Self {
        Self {
            samples: Vec::new(),
            targets: vec![
                QuantileTarget::new(0.5, 0.05),
                QuantileTarget::new(0.9, 0.01),
                QuantileTarget::new(0.99, 0.001),
            ],
        }
    }
}

impl Accumulator for ExactAccumulator {
    fn ingest(&mut self, value: f64) {
        self.samples.push(value);
    }

    fn sum(&self) -> f64 {
        self.samples.iter().sum()
    }

    fn count(&self) -> u64 {
        self.samples.len() as u64
    }

    fn targets(&self) -> &[QuantileTarget] {
        &self.targets
    }

    fn query(&self, quantile: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (quantile * sorted.len() as f64).ceil() as usize;
        sorted.get(rank.saturating_sub(1)).copied()
    }
}

fn exact_summary() -> (Arc<ManualTimeProvider>, Summary<ExactAccumulator>) {
    let clock = Arc::new(ManualTimeProvider::new());
    let summary = Summary::with_parts(BAR, ExactAccumulator::new, clock.clone());
    (clock, summary)
}

fn quantile_of(value: &sliding_summary::SummaryValue, quantile: f64) -> Option<f64> {
    value
        .quantiles
        .iter()
        .find(|(q, _)| *q == quantile)
        .and_then(|(_, estimate)| *estimate)
}

#[test]
fn window_constants_are_consistent() {
    assert_eq!(MAX_AGE, Duration::from_secs(600));
    assert_eq!(WINDOW_COUNT, 5);
    assert_eq!(WINDOW_INTERVAL * WINDOW_COUNT as u32, MAX_AGE);
}

#[test]
fn quantiles_cover_exactly_the_retention_period() {
    let (clock, summary) = exact_summary();
    let labels = [("foo", "bar")];
    for value in [3.0, 5.2, 13.0, 4.0] {
        summary.observe(&labels, value).unwrap();
    }

    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 4);
    assert!((value.sum - 25.2).abs() < 1e-9);
    assert_eq!(quantile_of(&value, 0.5), Some(4.0));
    assert_eq!(quantile_of(&value, 0.99), Some(13.0));

    clock.advance(MAX_AGE - Duration::from_secs(5));
    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 4);
    assert_eq!(quantile_of(&value, 0.5), Some(4.0));

    clock.advance(Duration::from_secs(10));
    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 0);
    assert_eq!(value.sum, 0.0);
    assert!(value.quantiles.iter().all(|(_, estimate)| estimate.is_none()));
}

#[test]
fn observations_drop_out_batch_by_batch() {
    let (clock, summary) = exact_summary();
    let labels = [("foo", "bar")];

    summary.observe(&labels, 1.0).unwrap();
    clock.advance(WINDOW_INTERVAL + Duration::from_millis(100));
    summary.observe(&labels, 2.0).unwrap();
    clock.advance(WINDOW_INTERVAL);
    summary.observe(&labels, 3.0).unwrap();

    // All three batches are inside the retention period.
    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 3);
    assert!((value.sum - 6.0).abs() < 1e-9);

    // Five intervals after the first batch, only it has expired.
    clock.advance(WINDOW_INTERVAL * 3);
    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 2);
    assert!((value.sum - 5.0).abs() < 1e-9);

    // One more interval retires the second batch.
    clock.advance(WINDOW_INTERVAL);
    let value = summary.get(&labels).unwrap();
    assert_eq!(value.count, 1);
    assert!((value.sum - 3.0).abs() < 1e-9);
}

#[test]
fn reads_do_not_extend_retention() {
    let (clock, summary) = exact_summary();
    let labels = [("foo", "bar")];
    summary.observe(&labels, 9.0).unwrap();

    // Polling every interval must not keep the observation alive.
    for step in 1..=WINDOW_COUNT {
        clock.advance(WINDOW_INTERVAL + Duration::from_millis(1));
        let value = summary.get(&labels).unwrap();
        let expected = if step < WINDOW_COUNT { 1 } else { 0 };
        assert_eq!(value.count, expected, "step {step}");
    }
}

#[test]
fn registry_end_to_end_exposition() {
    let clock = Arc::new(ManualTimeProvider::new());
    let registry = SummaryRegistry::with_time_provider(clock.clone());
    registry.register(BAR).unwrap();

    for value in [3.0, 5.2, 13.0, 4.0] {
        registry.observe(BAR, &[("foo", "bar")], value).unwrap();
    }

    let text = encode_text(&registry);
    assert!(text.starts_with("# TYPE bar summary\n# HELP bar bar description\n"));
    assert!(text.contains("bar{foo=\"bar\",quantile=\"0.5\"} "));
    assert!(text.contains("bar{foo=\"bar\",quantile=\"0.9\"} "));
    assert!(text.contains("bar{foo=\"bar\",quantile=\"0.99\"} "));
    assert!(text.contains("bar_sum{foo=\"bar\"} 25.2"));
    assert!(text.contains("bar_total{foo=\"bar\"} 4"));

    // After the retention period the series is still exposed, with the
    // no-data sentinel for each quantile.
    clock.advance(MAX_AGE + Duration::from_secs(5));
    let text = encode_text(&registry);
    assert!(text.contains("bar{foo=\"bar\",quantile=\"0.5\"} NaN"));
    assert!(text.contains("bar_sum{foo=\"bar\"} 0"));
    assert!(text.contains("bar_total{foo=\"bar\"} 0"));
}

#[test]
fn concurrent_observations_are_all_counted() {
    let summary = Arc::new(Summary::new(SummaryDescriptor::new(
        "concurrent",
        "concurrency test",
        &["worker"],
    )));

    let mut handles = Vec::new();
    for worker in 0..4 {
        let summary = Arc::clone(&summary);
        handles.push(std::thread::spawn(move || {
            let worker = worker.to_string();
            for i in 0..250 {
                summary
                    .observe(&[("worker", worker.as_str())], f64::from(i))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let total: u64 = summary
        .values()
        .iter()
        .map(|(_, value)| value.count)
        .sum();
    assert_eq!(total, 1_000);
}

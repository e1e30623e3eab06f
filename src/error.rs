use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric '{0}' already registered")]
    AlreadyRegistered(&'static str),
    #[error("metric '{0}' is not registered")]
    NotRegistered(&'static str),
    #[error("metric '{metric}' missing required label '{label}'")]
    MissingLabel {
        metric: &'static str,
        label: &'static str,
    },
    #[error("metric '{metric}' received unexpected label '{label}'")]
    UnexpectedLabel {
        metric: &'static str,
        label: &'static str,
    },
    #[error("metric '{metric}' received label '{label}' more than once")]
    DuplicateLabel {
        metric: &'static str,
        label: &'static str,
    },
    #[error("quantile target '{0}' outside (0, 1)")]
    InvalidQuantile(f64),
    #[error("quantile error bound '{0}' outside (0, 1)")]
    InvalidErrorBound(f64),
    #[error("window max age {max_age:?} too small for {window_count} buckets")]
    InvalidWindow {
        max_age: Duration,
        window_count: usize,
    },
}

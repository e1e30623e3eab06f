//! Summary metrics whose quantiles, sum and count cover only the most recent
//! ten minutes of observations.
//!
//! The window is a ring of five accumulators staggered in age. Observations
//! are broadcast to every bucket and reads come from the oldest one, so the
//! delegated estimator never needs to merge or expire anything itself:
//! expiry is replacing the oldest bucket with a fresh accumulator every two
//! minutes. The estimator behind each bucket defaults to a CKMS sketch but
//! can be any [`Accumulator`].
//!
//! ```
//! use sliding_summary::{Summary, SummaryDescriptor};
//!
//! const REQUEST_SECONDS: SummaryDescriptor =
//!     SummaryDescriptor::new("request_seconds", "Request durations", &["code"]);
//!
//! let summary = Summary::new(REQUEST_SECONDS);
//! summary.observe(&[("code", "200")], 0.23).unwrap();
//! let value = summary.get(&[("code", "200")]).unwrap();
//! assert_eq!(value.count, 1);
//! ```

pub mod accumulator;
pub mod error;
mod labels;
pub mod registry;
pub mod summary;
pub mod text;
pub mod time;
pub mod window;

pub use accumulator::{Accumulator, CkmsAccumulator, QuantileTarget, DEFAULT_TARGETS};
pub use error::MetricError;
pub use registry::{global_registry, SummaryRegistry};
pub use summary::{Summary, SummaryDescriptor, SummaryValue};
pub use text::{encode_text, CONTENT_TYPE};
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider};
pub use window::{RotatingBucketSet, MAX_AGE, WINDOW_COUNT, WINDOW_INTERVAL};

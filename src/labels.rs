use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::MetricError;

/// Map key for one label set: the label values in declaration order, with a
/// precomputed hash.
#[derive(Clone, Debug, Eq)]
pub(crate) struct LabelKey {
    values: Vec<String>,
    hash: u64,
}

impl LabelKey {
    pub(crate) fn new(values: Vec<String>) -> Self {
        let mut hasher = DefaultHasher::new();
        values.hash(&mut hasher);
        let hash = hasher.finish();
        Self { values, hash }
    }

    pub(crate) fn values(&self) -> &[String] {
        &self.values
    }
}

impl PartialEq for LabelKey {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Hash for LabelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Validate a caller-supplied label set against the metric's declared label
/// names and reorder it into a [`LabelKey`].
pub(crate) fn normalize_labels(
    metric: &'static str,
    expected: &'static [&'static str],
    labels: &[(&'static str, &str)],
) -> Result<LabelKey, MetricError> {
    if let Some(&(name, _)) = labels.iter().find(|(name, _)| !expected.contains(name)) {
        return Err(MetricError::UnexpectedLabel {
            metric,
            label: name,
        });
    }
    for (idx, &(name, _)) in labels.iter().enumerate() {
        if labels[..idx].iter().any(|&(seen, _)| seen == name) {
            return Err(MetricError::DuplicateLabel {
                metric,
                label: name,
            });
        }
    }
    let mut ordered = Vec::with_capacity(expected.len());
    for &want in expected {
        let value = labels
            .iter()
            .find(|&&(name, _)| name == want)
            .map(|&(_, value)| value)
            .ok_or(MetricError::MissingLabel {
                metric,
                label: want,
            })?;
        ordered.push(value.to_string());
    }
    Ok(LabelKey::new(ordered))
}

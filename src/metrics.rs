use std::collections::BTreeMap;

/// Scalar metrics, ready to log.
pub type Metrics = BTreeMap<String, f64>;

/// Metric samples collected over batch, learner-step or replica dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetrics {
    samples: BTreeMap<String, Vec<f64>>,
}

impl RawMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.samples.entry(name.into()).or_default().push(value);
    }

    pub fn extend(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) {
        self.samples.entry(name.into()).or_default().extend(values);
    }

    pub fn merge(&mut self, other: RawMetrics) {
        for (name, values) in other.samples {
            self.extend(name, values);
        }
    }

    /// Average every metric down to a scalar. Names with no samples are dropped.
    pub fn reduce_mean(&self) -> Metrics {
        self.samples
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.clone(), values.iter().sum::<f64>() / values.len() as f64))
            .collect()
    }
}

//! Typed, labeled values produced by a collection cycle.

use std::fmt;

use crate::catalog::MetricId;

/// One value of one catalog metric.
///
/// `value` is NaN when the underlying stat could not be determined.
#[derive(Debug, Clone)]
pub struct Observation {
    metric: MetricId,
    value: f64,
    labels: Vec<String>,
}

/// Label values do not match the catalog schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationError {
    pub metric: MetricId,
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for ObservationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} expects {} label values, got {}",
            self.metric.entry().fq_name(),
            self.expected,
            self.got
        )
    }
}

impl std::error::Error for ObservationError {}

impl Observation {
    /// Builds an observation, checking label arity against the catalog.
    pub fn new(
        metric: MetricId,
        value: f64,
        labels: Vec<String>,
    ) -> Result<Self, ObservationError> {
        let expected = metric.labels().len();
        if labels.len() != expected {
            return Err(ObservationError {
                metric,
                expected,
                got: labels.len(),
            });
        }
        Ok(Self {
            metric,
            value,
            labels,
        })
    }

    pub fn metric(&self) -> MetricId {
        self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Equality that treats two NaN values as equal.
    pub fn same_as(&self, other: &Observation) -> bool {
        self.metric == other.metric
            && self.value.to_bits() == other.value.to_bits()
            && self.labels == other.labels
    }
}

/// Push target for observations of one cycle.
///
/// The engine emits in a fixed order; sinks are free to regroup.
pub trait ObservationSink {
    fn observe(&mut self, observation: Observation);
}

impl ObservationSink for Vec<Observation> {
    fn observe(&mut self, observation: Observation) {
        self.push(observation);
    }
}

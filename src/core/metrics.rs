//! Metric descriptors and the events collectors emit against them.
//!
//! A descriptor fixes a metric's name, help text and ordered label names. An
//! event carries one value plus label values in the same order. How events
//! are exported is up to the consumer.

use std::{fmt, sync::Arc};

use serde::Serialize;
use thiserror::Error;

/// Static description of one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: &'static str,
    pub label_names: Vec<&'static str>,
}

impl MetricDescriptor {
    /// Builds `<namespace>_<subsystem>_<name>`.
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &'static str,
        label_names: &[&'static str],
    ) -> Arc<Self> {
        Arc::new(MetricDescriptor {
            name: format!("{}_{}_{}", namespace, subsystem, name),
            help,
            label_names: label_names.to_vec(),
        })
    }
}

impl fmt::Display for MetricDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.label_names.join(","))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Metric {metric} expects {expected} label values, got {actual}")]
pub struct LabelCardinalityError {
    pub metric: String,
    pub expected: usize,
    pub actual: usize,
}

/// One sample: a descriptor, a value, and label values in descriptor order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEvent {
    pub descriptor: Arc<MetricDescriptor>,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl MetricEvent {
    /// Builds an event, rejecting label values that do not line up with the
    /// descriptor's label names.
    pub fn new(
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self, LabelCardinalityError> {
        if label_values.len() != descriptor.label_names.len() {
            return Err(LabelCardinalityError {
                metric: descriptor.name.clone(),
                expected: descriptor.label_names.len(),
                actual: label_values.len(),
            });
        }
        Ok(MetricEvent {
            descriptor: Arc::clone(descriptor),
            value,
            label_values,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Value of the label called `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names
            .iter()
            .position(|label| *label == name)
            .map(|i| self.label_values[i].as_str())
    }
}

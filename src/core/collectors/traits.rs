use std::sync::Arc;

use super::types::CollectorResult;
use crate::{
    config::features::Feature,
    core::{
        metrics::{MetricDescriptor, MetricEvent},
        transport::Transport,
    },
};

/// A core trait that every metric domain collector implements.
///
/// A collector owns the descriptors of its domain, decides which CLI
/// commands to run for the device's dialect, and turns the parsed records
/// into [`MetricEvent`]s. It holds no per-device state, so one instance
/// serves every device concurrently.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Stable identifier, used for registry lookups and the
    /// `collector` label of scrape metrics.
    fn name(&self) -> &'static str;

    /// Toggle that gates this collector in the configuration.
    fn feature(&self) -> Feature;

    /// Every descriptor this collector can emit against.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Runs the domain's commands on `transport` and emits events labeled
    /// with `target`.
    ///
    /// Only transport failures and a domain that the dialect does not
    /// implement at all are returned as errors. A failing section is logged
    /// and skipped.
    async fn collect(&self, transport: &dyn Transport, target: &str) -> CollectorResult<Vec<MetricEvent>>;
}

use std::sync::Arc;

use super::{
    environment::EnvironmentCollector, error::CollectorError, system::SystemCollector,
    traits::Collector, types::CollectorResult,
};
use crate::core::dialect::DialectRegistry;

/// Ordered set of collectors, built once at startup and shared read-only.
///
/// Collectors run in registration order on every device, so the order here
/// is the order commands reach a device.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every collector shipped with the crate, sharing one dialect table.
    pub fn with_builtin_collectors(namespace: &str, dialects: Arc<DialectRegistry>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EnvironmentCollector::new(namespace, dialects.clone())));
        registry.register(Arc::new(SystemCollector::new(namespace, dialects)));
        registry
    }

    /// Appends a collector, replacing any earlier one with the same name in
    /// place.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> &mut Self {
        match self.collectors.iter_mut().find(|c| c.name() == collector.name()) {
            Some(slot) => *slot = collector,
            None => self.collectors.push(collector),
        }
        self
    }

    /// Retrieves a collector by name. Returns an error if no collector with that name exists.
    pub fn get(&self, name: &str) -> CollectorResult<Arc<dyn Collector>> {
        self.collectors
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| CollectorError::CollectorNotFound(name.to_string()))
    }

    /// Names in registration order.
    pub fn list(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Collector>> {
        self.collectors.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collectors.iter().any(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        config::features::Feature,
        core::{
            metrics::{MetricDescriptor, MetricEvent},
            transport::Transport,
        },
    };

    struct Named(&'static str, Feature);

    #[async_trait]
    impl Collector for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn feature(&self) -> Feature {
            self.1
        }

        fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
            Vec::new()
        }

        async fn collect(&self, _: &dyn Transport, _: &str) -> CollectorResult<Vec<MetricEvent>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn builtin_collectors_are_ordered() {
        let registry =
            CollectorRegistry::with_builtin_collectors("aruba", Arc::new(DialectRegistry::with_builtin_parsers()));

        assert_eq!(registry.list(), vec!["environment", "system"]);
        assert_eq!(registry.get("system").unwrap().feature(), Feature::System);
        assert!(registry.contains("environment"));
    }

    #[test]
    fn registry_get_errors_on_unknown() {
        let registry = CollectorRegistry::new();

        let err = match registry.get("bgp") {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, CollectorError::CollectorNotFound(ref name) if name == "bgp"));
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = CollectorRegistry::new();
        registry
            .register(Arc::new(Named("a", Feature::Bgp)))
            .register(Arc::new(Named("b", Feature::Optics)))
            .register(Arc::new(Named("a", Feature::Interfaces)));

        assert_eq!(registry.list(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().feature(), Feature::Interfaces);
        assert_eq!(registry.len(), 2);
    }
}

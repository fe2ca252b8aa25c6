//! Scrape executor.
//!
//! The `ScrapeExecutor` runs every enabled collector against every device of
//! one scrape. Devices are scraped concurrently, one task each; collectors of
//! a device run one after another on that device's session. Failures stay
//! inside the (device, collector) pair they happened in and are reported
//! through the `collector_success` metric.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use super::{
    collectors::{error::CollectorError, registry::CollectorRegistry},
    metrics::{MetricDescriptor, MetricEvent},
    transport::Transport,
};
use crate::config::Config;

const SCRAPE_LABELS: &[&str] = &["target", "collector"];

/// A device to scrape: its configured host and an open session to it.
#[derive(Clone)]
pub struct Device {
    pub host: String,
    pub transport: Arc<dyn Transport>,
}

impl Device {
    pub fn new(host: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Device {
            host: host.into(),
            transport,
        }
    }
}

/// Runs collectors against devices and gathers their events.
pub struct ScrapeExecutor {
    config: Arc<Config>,
    registry: Arc<CollectorRegistry>,
    success: Arc<MetricDescriptor>,
    duration: Arc<MetricDescriptor>,
}

impl ScrapeExecutor {
    /// Creates a new executor.
    ///
    /// # Arguments
    /// * `config` - Loaded configuration, used for per-host feature toggles
    /// * `registry` - Collectors to run, in order
    pub fn new(config: Arc<Config>, registry: Arc<CollectorRegistry>) -> Self {
        let success = MetricDescriptor::new(
            &config.namespace,
            "collector",
            "success",
            "Whether a collector succeeded",
            SCRAPE_LABELS,
        );
        let duration = MetricDescriptor::new(
            &config.namespace,
            "collector",
            "duration_seconds",
            "Duration of a collector scrape",
            SCRAPE_LABELS,
        );
        Self {
            config,
            registry,
            success,
            duration,
        }
    }

    /// Descriptors of the per-collector scrape metrics.
    pub fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![self.success.clone(), self.duration.clone()]
    }

    /// Scrapes all `devices` once and returns every event produced.
    pub async fn scrape(&self, devices: Vec<Device>) -> Vec<MetricEvent> {
        let start = Instant::now();
        let device_count = devices.len();

        let tasks: Vec<_> = devices
            .into_iter()
            .map(|device| {
                let worker = DeviceScrape {
                    config: self.config.clone(),
                    registry: self.registry.clone(),
                    success: self.success.clone(),
                    duration: self.duration.clone(),
                };
                let host = device.host.clone();
                (host, tokio::spawn(async move { worker.run(device).await }))
            })
            .collect();

        let mut events = Vec::new();
        for (host, task) in tasks {
            match task.await {
                Ok(found) => events.extend(found),
                Err(e) => error!("Scrape task for '{}' failed: {}", host, e),
            }
        }

        info!(
            "Scraped {} device(s) in {:.3}s, {} event(s)",
            device_count,
            start.elapsed().as_secs_f64(),
            events.len()
        );
        events
    }
}

/// Everything one device task needs, owned so it can move into the task.
struct DeviceScrape {
    config: Arc<Config>,
    registry: Arc<CollectorRegistry>,
    success: Arc<MetricDescriptor>,
    duration: Arc<MetricDescriptor>,
}

impl DeviceScrape {
    async fn run(self, device: Device) -> Vec<MetricEvent> {
        let features = self.config.effective_features(&device.host);
        let mut events = Vec::new();

        for collector in self.registry.iter() {
            let name = collector.name();
            if !features.is_enabled(collector.feature()) {
                debug!("[{}] {}: disabled by feature '{}'", name, device.host, collector.feature());
                continue;
            }

            let start = Instant::now();
            let ok = match collector.collect(device.transport.as_ref(), &device.host).await {
                Ok(found) => {
                    trace!("[{}] {}: {} event(s)", name, device.host, found.len());
                    events.extend(found);
                    true
                }
                Err(e @ CollectorError::DomainUnsupportedForDialect { .. }) => {
                    debug!("[{}] {}: {}", name, device.host, e);
                    false
                }
                Err(e) => {
                    error!("[{}] {}: {}", name, device.host, e);
                    false
                }
            };
            let elapsed = start.elapsed().as_secs_f64();

            let labels = vec![device.host.clone(), name.to_string()];
            for (descriptor, value) in [(&self.success, if ok { 1.0 } else { 0.0 }), (&self.duration, elapsed)] {
                match MetricEvent::new(descriptor, value, labels.clone()) {
                    Ok(event) => events.push(event),
                    Err(e) => error!("{}", e),
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::core::{
        collectors::test_support::MockTransport, dialect::DialectRegistry, transport::OsType,
    };

    const TEMPERATURE: &str = "\
1/1-Inlet-Air                   line-card-module  22.00 C     normal
";
    const POWER: &str = "\
1/1      JL086A   CN12KP1234        OK             AC      100-240V   680
";
    const FAN: &str = "\
Fan information
---------------------------------------------------------------------------
1/1           N/A      N/A            normal  front-to-back  ok      8725
";

    fn cx_switch() -> MockTransport {
        MockTransport::new(OsType::ArubaCXSwitch)
            .with_output("show environment temperature", TEMPERATURE)
            .with_output("show environment power-supply", POWER)
            .with_output("show environment fan", FAN)
    }

    fn executor(toml: &str) -> ScrapeExecutor {
        let config = Arc::new(Config::from_toml_str(toml).unwrap());
        let registry = CollectorRegistry::with_builtin_collectors(
            &config.namespace,
            Arc::new(DialectRegistry::with_builtin_parsers()),
        );
        ScrapeExecutor::new(config, Arc::new(registry))
    }

    fn success(events: &[MetricEvent], target: &str, collector: &str) -> Option<f64> {
        events
            .iter()
            .find(|e| {
                e.name() == "aruba_collector_success"
                    && e.label("target") == Some(target)
                    && e.label("collector") == Some(collector)
            })
            .map(|e| e.value)
    }

    #[tokio::test]
    async fn every_enabled_pair_reports_success_and_duration() {
        let executor = executor("");
        let devices = vec![Device::new("sw1", Arc::new(cx_switch()))];

        let events = executor.scrape(devices).await;

        assert_eq!(success(&events, "sw1", "environment"), Some(1.0));
        // CX switches have no system domain.
        assert_eq!(success(&events, "sw1", "system"), Some(0.0));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.name() == "aruba_collector_duration_seconds")
                .count(),
            2
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| e.name().starts_with("aruba_environment_"))
                .count(),
            7
        );
    }

    #[tokio::test]
    async fn device_override_disables_collector() {
        let executor = executor(
            r#"
[features]
environment = true

[[devices]]
host = "sw2"
[devices.features]
environment = false
"#,
        );
        let sw1 = Arc::new(cx_switch());
        let sw2 = Arc::new(cx_switch());
        let devices = vec![
            Device::new("sw1", sw1.clone()),
            Device::new("sw2", sw2.clone()),
        ];

        let events = executor.scrape(devices).await;

        assert_eq!(success(&events, "sw1", "environment"), Some(1.0));
        assert_eq!(success(&events, "sw2", "environment"), None);
        assert!(sw2.calls().is_empty());
        assert_eq!(sw1.calls().len(), 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn transport_failure_is_contained_to_its_device() {
        let executor = executor("[features]\nsystem = false\n");
        let broken = cx_switch().failing_on("show environment temperature");
        let devices = vec![
            Device::new("sw1", Arc::new(cx_switch())),
            Device::new("sw-broken", Arc::new(broken)),
        ];

        let events = executor.scrape(devices).await;

        assert_eq!(success(&events, "sw1", "environment"), Some(1.0));
        assert_eq!(success(&events, "sw-broken", "environment"), Some(0.0));
        assert!(!events
            .iter()
            .any(|e| e.name().starts_with("aruba_environment_") && e.label("target") == Some("sw-broken")));
        assert!(logs_contain("[environment] sw-broken: Collector 'environment' transport failure"));
    }

    #[tokio::test]
    async fn no_devices_no_events() {
        let events = executor("").scrape(Vec::new()).await;
        assert!(events.is_empty());
    }
}

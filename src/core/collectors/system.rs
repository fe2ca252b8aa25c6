use std::sync::Arc;

use tracing::trace;

use super::{
    section::{run_sections, Section},
    traits::Collector,
    types::CollectorResult,
};
use crate::{
    config::features::Feature,
    core::{
        dialect::{DialectRegistry, Domain, Record},
        metrics::{MetricDescriptor, MetricEvent},
        transport::Transport,
    },
};

const SUBSYSTEM: &str = "system";

const VERSION_LABELS: &[&str] = &["target", "version"];
const POOL_LABELS: &[&str] = &["target", "type"];

const SECTIONS: &[Section] = &[
    Section::new(Domain::Version, "show version"),
    Section::new(Domain::Memory, "show memory"),
    Section::new(Domain::Cpu, "show cpu"),
];

/// Software version, memory pools and CPU utilization.
pub struct SystemCollector {
    dialects: Arc<DialectRegistry>,
    version_info: Arc<MetricDescriptor>,
    memory_total: Arc<MetricDescriptor>,
    memory_used: Arc<MetricDescriptor>,
    memory_free: Arc<MetricDescriptor>,
    cpu_used: Arc<MetricDescriptor>,
    cpu_idle: Arc<MetricDescriptor>,
}

impl SystemCollector {
    pub const NAME: &'static str = "system";

    pub fn new(namespace: &str, dialects: Arc<DialectRegistry>) -> Self {
        let desc = |name: &str, help: &'static str, labels: &[&'static str]| {
            MetricDescriptor::new(namespace, SUBSYSTEM, name, help, labels)
        };
        SystemCollector {
            dialects,
            version_info: desc("version_info", "Running software version, always 1", VERSION_LABELS),
            memory_total: desc("memory_total_kilobytes", "Total memory in kilobytes", POOL_LABELS),
            memory_used: desc("memory_used_kilobytes", "Used memory in kilobytes", POOL_LABELS),
            memory_free: desc("memory_free_kilobytes", "Free memory in kilobytes", POOL_LABELS),
            cpu_used: desc("cpu_used_percent", "CPU time spent in user, nice and system", POOL_LABELS),
            cpu_idle: desc("cpu_idle_percent", "CPU idle time", POOL_LABELS),
        }
    }

    fn events(&self, target: &str, record: &Record) -> CollectorResult<Vec<MetricEvent>> {
        let events = match record {
            Record::Version(v) => vec![MetricEvent::new(
                &self.version_info,
                1.0,
                vec![target.to_string(), v.version.clone()],
            )?],
            Record::Memory(m) => {
                let labels = vec![target.to_string(), m.kind.clone()];
                vec![
                    MetricEvent::new(&self.memory_total, m.total, labels.clone())?,
                    MetricEvent::new(&self.memory_used, m.used, labels.clone())?,
                    MetricEvent::new(&self.memory_free, m.free, labels)?,
                ]
            }
            Record::Cpu(c) => {
                let labels = vec![target.to_string(), c.kind.clone()];
                vec![
                    MetricEvent::new(&self.cpu_used, c.used, labels.clone())?,
                    MetricEvent::new(&self.cpu_idle, c.idle, labels)?,
                ]
            }
            other => {
                trace!("[{}] ignoring foreign record {:?}", Self::NAME, other);
                Vec::new()
            }
        };
        Ok(events)
    }
}

#[async_trait::async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn feature(&self) -> Feature {
        Feature::System
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            self.version_info.clone(),
            self.memory_total.clone(),
            self.memory_used.clone(),
            self.memory_free.clone(),
            self.cpu_used.clone(),
            self.cpu_idle.clone(),
        ]
    }

    async fn collect(&self, transport: &dyn Transport, target: &str) -> CollectorResult<Vec<MetricEvent>> {
        let reports = run_sections(Self::NAME, &self.dialects, SECTIONS, transport, target).await?;

        let mut events = Vec::new();
        for (_, report) in &reports {
            for record in report.records.values() {
                events.extend(self.events(target, record)?);
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::core::{
        collectors::{error::CollectorError, test_support::MockTransport},
        transport::OsType,
    };

    const CONTROLLER_VERSION: &str = "\
Aruba Operating System Software.
ArubaOS (MODEL: 7030), Version 8.10.0.5
Website: http://www.arubanetworks.com
";

    const INSTANT_MEMORY: &str = "\
MemTotal:        1022404 kB
MemFree:          412380 kB
MemAvailable:     498632 kB
";

    const INSTANT_CPU: &str = "\
cpu: user  4% nice  0% system  3% idle 92% io  0% irq  0% softirq  1%
cpu0: user  6% nice  0% system  4% idle 89% io  0% irq  0% softirq  1%
";

    fn collector() -> SystemCollector {
        SystemCollector::new("aruba", Arc::new(DialectRegistry::with_builtin_parsers()))
    }

    #[tokio::test]
    async fn instant_emits_version_memory_and_cpu() {
        let transport = MockTransport::new(OsType::ArubaInstant)
            .with_output("show version", CONTROLLER_VERSION)
            .with_output("show memory", INSTANT_MEMORY)
            .with_output("show cpu", INSTANT_CPU);

        let events = collector().collect(&transport, "iap1").await.unwrap();

        // version + 3 memory + 2 cpus x 2
        assert_eq!(events.len(), 8);

        let version = events.iter().find(|e| e.name() == "aruba_system_version_info").unwrap();
        assert_eq!(version.value, 1.0);
        assert_eq!(version.label("version"), Some("ArubaInstant-8.10.0.5"));

        let used = events
            .iter()
            .find(|e| e.name() == "aruba_system_memory_used_kilobytes")
            .unwrap();
        assert_eq!(used.value, 523772.0);
        assert_eq!(used.label("type"), Some("Kb"));

        let cpu0 = events
            .iter()
            .find(|e| e.name() == "aruba_system_cpu_used_percent" && e.label("type") == Some("cpu0"))
            .unwrap();
        assert_eq!(cpu0.value, 10.0);
    }

    #[tokio::test]
    #[traced_test]
    async fn controller_skips_cpu_without_sending_it() {
        let transport = MockTransport::new(OsType::ArubaController)
            .with_output("show version", CONTROLLER_VERSION)
            .with_output(
                "show memory",
                "Memory (Kb): total: 3908684, used: 1881172, free: 2027512\n",
            );

        let events = collector().collect(&transport, "mc1").await.unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(transport.calls(), vec!["show version", "show memory"]);
        assert!(logs_contain("'cpu' is not implemented for ArubaController"));
    }

    #[tokio::test]
    async fn switches_have_no_system_domain() {
        for os_type in [OsType::ArubaSwitch, OsType::ArubaCXSwitch] {
            let transport = MockTransport::new(os_type);

            let err = collector().collect(&transport, "sw1").await.unwrap_err();

            assert!(matches!(err, CollectorError::DomainUnsupportedForDialect { .. }));
            assert!(transport.calls().is_empty());
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_section_does_not_hide_the_rest() {
        let transport = MockTransport::new(OsType::ArubaInstant)
            .with_output("show version", "no version here\n")
            .with_output("show memory", INSTANT_MEMORY)
            .with_output("show cpu", INSTANT_CPU);

        let events = collector().collect(&transport, "iap1").await.unwrap();

        assert_eq!(events.len(), 7);
        assert!(logs_contain("no records produced"));
    }
}

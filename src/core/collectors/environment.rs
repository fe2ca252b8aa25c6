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
        parsers::environment::{
            fan_direction_value, fan_speed_value, fan_status_value, power_supply_status_value,
            temperature_status_value,
        },
        transport::{OsType, Transport},
    },
};

const SUBSYSTEM: &str = "environment";

const TEMPERATURE_LABELS: &[&str] = &["target", "slot_sensor", "module_type"];
const POWER_SUPPLY_LABELS: &[&str] = &["target", "power_slot", "product_number", "product_serial_number"];
const FAN_LABELS: &[&str] = &["target", "fan_slot"];

/// ArubaOS-Switch only answers the temperature and power tables.
const SWITCH_SECTIONS: &[Section] = &[
    Section::new(Domain::Temperature, "show environment temperature"),
    Section::new(Domain::PowerSupply, "show environment power-supply"),
];

const DEFAULT_SECTIONS: &[Section] = &[
    Section::new(Domain::Temperature, "show environment temperature"),
    Section::new(Domain::PowerSupply, "show environment power-supply"),
    Section::new(Domain::Fan, "show environment fan"),
];

/// Temperature sensors, power supplies and fans.
pub struct EnvironmentCollector {
    dialects: Arc<DialectRegistry>,
    temperature: Arc<MetricDescriptor>,
    temperature_status: Arc<MetricDescriptor>,
    power_supply_status: Arc<MetricDescriptor>,
    fan_status: Arc<MetricDescriptor>,
    fan_speed: Arc<MetricDescriptor>,
    fan_direction: Arc<MetricDescriptor>,
    fan_rpm: Arc<MetricDescriptor>,
}

impl EnvironmentCollector {
    pub const NAME: &'static str = "environment";

    pub fn new(namespace: &str, dialects: Arc<DialectRegistry>) -> Self {
        let desc = |name: &str, help: &'static str, labels: &[&'static str]| {
            MetricDescriptor::new(namespace, SUBSYSTEM, name, help, labels)
        };
        EnvironmentCollector {
            dialects,
            temperature: desc("temperature", "Temperature in Celsius", TEMPERATURE_LABELS),
            temperature_status: desc(
                "temperature_status",
                "Status of the sensor: normal = 1",
                TEMPERATURE_LABELS,
            ),
            power_supply_status: desc(
                "power_supply_status",
                "Status of the power supply: OK = 1",
                POWER_SUPPLY_LABELS,
            ),
            fan_status: desc("fan_status", "Status of the fan: ok = 1", FAN_LABELS),
            fan_speed: desc("fan_speed", "Speed of the fan: 0 = slow, 1 = fast", FAN_LABELS),
            fan_direction: desc(
                "fan_direction",
                "Direction of the fan: 0 = front-to-back, 1 = back-to-front",
                FAN_LABELS,
            ),
            fan_rpm: desc("fan_rpm", "RPM of the fan", FAN_LABELS),
        }
    }

    /// Commands sent to a device of the given dialect.
    pub fn sections(os_type: OsType) -> &'static [Section] {
        match os_type {
            OsType::ArubaSwitch => SWITCH_SECTIONS,
            _ => DEFAULT_SECTIONS,
        }
    }

    fn events(&self, target: &str, record: &Record) -> CollectorResult<Vec<MetricEvent>> {
        let events = match record {
            Record::Temperature(t) => {
                let labels = vec![target.to_string(), t.slot_sensor.clone(), t.module_type.clone()];
                vec![
                    MetricEvent::new(&self.temperature, t.temperature, labels.clone())?,
                    MetricEvent::new(
                        &self.temperature_status,
                        temperature_status_value(&t.status),
                        labels,
                    )?,
                ]
            }
            Record::PowerSupply(p) => vec![MetricEvent::new(
                &self.power_supply_status,
                power_supply_status_value(&p.status),
                vec![
                    target.to_string(),
                    p.slot.clone(),
                    p.product_number.clone(),
                    p.serial_number.clone(),
                ],
            )?],
            Record::Fan(f) => {
                let labels = vec![target.to_string(), f.slot.clone()];
                vec![
                    MetricEvent::new(&self.fan_status, fan_status_value(&f.status), labels.clone())?,
                    MetricEvent::new(&self.fan_speed, fan_speed_value(&f.speed), labels.clone())?,
                    MetricEvent::new(
                        &self.fan_direction,
                        fan_direction_value(&f.direction),
                        labels.clone(),
                    )?,
                    MetricEvent::new(&self.fan_rpm, f.rpm, labels)?,
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
impl Collector for EnvironmentCollector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn feature(&self) -> Feature {
        Feature::Environment
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            self.temperature.clone(),
            self.temperature_status.clone(),
            self.power_supply_status.clone(),
            self.fan_status.clone(),
            self.fan_speed.clone(),
            self.fan_direction.clone(),
            self.fan_rpm.clone(),
        ]
    }

    async fn collect(&self, transport: &dyn Transport, target: &str) -> CollectorResult<Vec<MetricEvent>> {
        let sections = Self::sections(transport.os_type());
        let reports = run_sections(Self::NAME, &self.dialects, sections, transport, target).await?;

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
    use crate::core::collectors::{error::CollectorError, test_support::MockTransport};

    const TEMPERATURE: &str = "\
switch# show environment temperature
Temperature information
------------------------------------------------------------------------------
                                                    Current
Mbr/Slot-Sensor                 Module Type      temperature  Status
------------------------------------------------------------------------------
1/1-PHY-01-04                   line-card-module  37.50 C     normal
1/1-Inlet-Air                   line-card-module  22.00 C     normal
1/1-Switch-ASIC                 management-module  71.25 C     critical
";

    const POWER: &str = "\
switch# show environment power-supply
         Product  Serial            PSU            Input   Voltage    Wattage
Mbr/PSU  Number   Number            Status         Type    Range      Maximum
---------------------------------------------------------------------------------
1/1      JL086A   CN12KP1234        OK             AC      100-240V   680
1/2      JL086A   N/A               Absent         --      --         0
";

    const FAN: &str = "\
switch# show environment fan
Fan information
---------------------------------------------------------------------------
Mbr/Fan       Product  Serial Number  Speed   Direction      Status  RPM
              Name
---------------------------------------------------------------------------
1/1           N/A      N/A            normal  front-to-back  ok      8725
1/2           N/A      N/A            slow    back-to-front  fail    0
";

    fn collector() -> EnvironmentCollector {
        EnvironmentCollector::new("aruba", Arc::new(DialectRegistry::with_builtin_parsers()))
    }

    fn cx_transport() -> MockTransport {
        MockTransport::new(OsType::ArubaCXSwitch)
            .with_output("show environment temperature", TEMPERATURE)
            .with_output("show environment power-supply", POWER)
            .with_output("show environment fan", FAN)
    }

    fn find<'a>(events: &'a [MetricEvent], name: &str, label: (&str, &str)) -> Option<&'a MetricEvent> {
        events
            .iter()
            .find(|e| e.name() == name && e.label(label.0) == Some(label.1))
    }

    #[test]
    fn descriptors_are_namespaced_per_instance() {
        let aruba = collector();
        let lab = EnvironmentCollector::new("lab", Arc::new(DialectRegistry::new()));

        let names: Vec<_> = aruba.describe().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"aruba_environment_fan_rpm".to_string()));
        assert_eq!(lab.describe()[0].name, "lab_environment_temperature");
        assert_eq!(
            aruba.power_supply_status.label_names,
            vec!["target", "power_slot", "product_number", "product_serial_number"]
        );
    }

    #[tokio::test]
    async fn cx_switch_emits_all_sections() {
        let transport = cx_transport();

        let events = collector().collect(&transport, "sw1").await.unwrap();

        // 3 sensors x 2 + 2 supplies + 2 fans x 4
        assert_eq!(events.len(), 16);
        assert!(events.iter().all(|e| e.label("target") == Some("sw1")));

        let asic = find(&events, "aruba_environment_temperature", ("slot_sensor", "1/1-Switch-ASIC")).unwrap();
        assert_eq!(asic.value, 71.25);
        assert_eq!(asic.label("module_type"), Some("management-module"));
        let asic_status =
            find(&events, "aruba_environment_temperature_status", ("slot_sensor", "1/1-Switch-ASIC")).unwrap();
        assert_eq!(asic_status.value, 0.0);

        let psu = find(&events, "aruba_environment_power_supply_status", ("power_slot", "1/1")).unwrap();
        assert_eq!(psu.value, 1.0);
        assert_eq!(psu.label("product_serial_number"), Some("CN12KP1234"));
        let absent = find(&events, "aruba_environment_power_supply_status", ("power_slot", "1/2")).unwrap();
        assert_eq!(absent.value, 0.0);

        let direction = find(&events, "aruba_environment_fan_direction", ("fan_slot", "1/2")).unwrap();
        assert_eq!(direction.value, 1.0);
        let rpm = find(&events, "aruba_environment_fan_rpm", ("fan_slot", "1/1")).unwrap();
        assert_eq!(rpm.value, 8725.0);

        assert_eq!(
            transport.calls(),
            vec![
                "show environment temperature",
                "show environment power-supply",
                "show environment fan"
            ]
        );
    }

    #[tokio::test]
    async fn aruba_switch_never_asks_for_fans() {
        let transport = MockTransport::new(OsType::ArubaSwitch)
            .with_output("show environment temperature", TEMPERATURE)
            .with_output("show environment power-supply", POWER);

        let events = collector().collect(&transport, "sw2").await.unwrap();

        assert_eq!(events.len(), 8);
        assert!(!transport.calls().iter().any(|c| c.contains("fan")));
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_fan_table_keeps_other_sections() {
        let transport = MockTransport::new(OsType::ArubaCXSwitch)
            .with_output("show environment temperature", TEMPERATURE)
            .with_output("show environment power-supply", POWER)
            .with_output("show environment fan", "% Invalid input detected\n");

        let events = collector().collect(&transport, "sw1").await.unwrap();

        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| !e.name().contains("fan")));
        assert!(logs_contain("section 'Fan information' not found"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unparseable_lines_are_reported_and_skipped() {
        let mut temperature = String::from(TEMPERATURE);
        temperature.push_str("garbage\n");
        let transport = cx_transport().with_output("show environment temperature", &temperature);

        let events = collector().collect(&transport, "sw1").await.unwrap();

        assert_eq!(events.len(), 16);
        assert!(logs_contain("1 line(s) of 'temperature' output skipped"));
    }

    #[tokio::test]
    async fn unsupported_dialect_sends_nothing() {
        let transport = MockTransport::new(OsType::ArubaController);

        let err = collector().collect(&transport, "mc1").await.unwrap_err();

        assert!(matches!(
            err,
            CollectorError::DomainUnsupportedForDialect {
                os_type: OsType::ArubaController,
                ..
            }
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_aborts_the_domain() {
        let transport = cx_transport().failing_on("show environment power-supply");

        let err = collector().collect(&transport, "sw1").await.unwrap_err();

        assert!(matches!(err, CollectorError::Transport { collector: "environment", .. }));
        assert!(!transport.calls().contains(&"show environment fan".to_string()));
    }
}

//! Parsers for `show environment temperature|power-supply|fan`, plus the
//! status and enum normalizations applied when turning the records into
//! metric values.
//!
//! Sample output handled (ArubaOS-CX rendering, also used for ArubaOS-Switch):
//!
//! ```text
//! Temperature information
//! ------------------------------------------------------------------------------
//!                                                     Current
//! Mbr/Slot-Sensor                 Module Type      temperature  Status
//! ------------------------------------------------------------------------------
//! 1/1-PHY-01-04                   line-card-module  37.50 C     normal
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{candidate_lines, capture, decimal_field, find, FieldParseError, ParseError, ParseReport};

/// One temperature sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRecord {
    /// Member/slot plus sensor name, e.g. `1/1-Inlet-Air`. Unique per device.
    pub slot_sensor: String,
    /// Module the sensor sits on, e.g. `line-card-module`.
    pub module_type: String,
    /// Degrees Celsius. Negative readings are kept as printed.
    pub temperature: f64,
    /// Sensor state as printed; only `normal` counts as healthy.
    pub status: String,
}

/// One power supply bay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerSupplyRecord {
    /// Member/bay, e.g. `1/2`.
    pub slot: String,
    /// PSU state as printed (`OK`, `Absent`, `Fault`, ...).
    pub status: String,
    /// Product number of the installed unit, e.g. `JL086A`.
    pub product_number: String,
    /// Serial number, `N/A` when the row does not print one.
    pub serial_number: String,
}

/// One fan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanRecord {
    /// Member/fan position, e.g. `1/3`.
    pub slot: String,
    /// Speed class: `slow`, `normal`, `fast` or `max`.
    pub speed: String,
    /// Airflow direction such as `front-to-back`; empty when not printed.
    pub direction: String,
    /// Fan state as printed; only `ok` counts as healthy.
    pub status: String,
    /// Measured revolutions per minute.
    pub rpm: f64,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// `"normal"` is healthy, anything else is not.
pub fn temperature_status_value(status: &str) -> f64 {
    if status == "normal" {
        1.0
    } else {
        0.0
    }
}

/// Only an exact, upper-case `"OK"` is healthy.
pub fn power_supply_status_value(status: &str) -> f64 {
    if status == "OK" {
        1.0
    } else {
        0.0
    }
}

pub fn fan_status_value(status: &str) -> f64 {
    if status == "ok" {
        1.0
    } else {
        0.0
    }
}

/// `front-to-back` is 0, every other direction is 1.
pub fn fan_direction_value(direction: &str) -> f64 {
    if direction == "front-to-back" {
        0.0
    } else {
        1.0
    }
}

/// `slow` is 0, every other speed is 1.
pub fn fan_speed_value(speed: &str) -> f64 {
    if speed == "slow" {
        0.0
    } else {
        1.0
    }
}

// ============================================================================
// TEMPERATURE
// ============================================================================

const TEMPERATURE_NOISE: &[&str] = &["Temperature", "Slot", "-----", "show", "#", "Current"];

static SENSOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+").expect("valid regex"));
static MODULE_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}([a-zA-Z-]+)\s{2,}").expect("valid regex"));
static TEMPERATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+\.\d{2}\sC").expect("valid regex"));
static TRAILING_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}(\w+)$").expect("valid regex"));

/// Parses `show environment temperature`.
pub fn parse_temperature(output: &str) -> Result<ParseReport<TemperatureRecord>, ParseError> {
    let mut report = ParseReport::new();
    for (line_no, line) in candidate_lines(output, TEMPERATURE_NOISE) {
        report.push_line(temperature_line(line_no, line));
    }
    Ok(report)
}

fn temperature_line(
    line_no: usize,
    line: &str,
) -> Result<(String, TemperatureRecord), FieldParseError> {
    let slot_sensor = find(&SENSOR_RE, line_no, line, "slot_sensor")?;
    let module_type = capture(&MODULE_TYPE_RE, line_no, line, "module_type")?;
    let temperature = find(&TEMPERATURE_RE, line_no, line, "temperature")?;
    let status = capture(&TRAILING_WORD_RE, line_no, line, "status")?;
    let temperature = decimal_field(temperature, line_no, line, "temperature")?;

    Ok((
        slot_sensor.to_string(),
        TemperatureRecord {
            slot_sensor: slot_sensor.to_string(),
            module_type: module_type.to_string(),
            temperature,
            status: status.to_string(),
        },
    ))
}

// ============================================================================
// POWER SUPPLY
// ============================================================================

const POWER_NOISE: &[&str] = &["-----", "PSU", "Status", "show", "#"];

/// Column contract: slot, product number, serial number (may be missing),
/// status. A serial is `N/A` or carries at least one digit, so a purely
/// alphabetic third column is read as the status of a serial-less row.
static POWER_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<slot>\d+/\d+)\s+(?P<product>[\w-]+|N/A)\s+(?:(?P<serial>N/A|[\w-]*\d[\w-]*)\s+)?(?P<status>[A-Za-z][A-Za-z-]*)(?:\s|$)",
    )
    .expect("valid regex")
});

/// Parses `show environment power-supply`.
pub fn parse_power_supply(output: &str) -> Result<ParseReport<PowerSupplyRecord>, ParseError> {
    let mut report = ParseReport::new();
    for (line_no, line) in candidate_lines(output, POWER_NOISE) {
        report.push_line(power_supply_line(line_no, line));
    }
    Ok(report)
}

fn power_supply_line(
    line_no: usize,
    line: &str,
) -> Result<(String, PowerSupplyRecord), FieldParseError> {
    let caps = POWER_ROW_RE.captures(line).ok_or_else(|| {
        FieldParseError::new(line_no, line, "slot", "expected '<mbr>/<slot> <product> [serial] <status>'")
    })?;
    let group = |name: &'static str| {
        caps.name(name)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| FieldParseError::new(line_no, line, name, "column missing"))
    };
    let slot = group("slot")?;
    let product_number = group("product")?;
    let status = group("status")?;
    let serial_number = caps
        .name("serial")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    Ok((
        slot.clone(),
        PowerSupplyRecord {
            slot,
            status,
            product_number,
            serial_number,
        },
    ))
}

// ============================================================================
// FAN
// ============================================================================

const FAN_NOISE: &[&str] = &["-----", "Name", "Status", "show", "#"];

/// The fan table: everything after the dashed rule that follows the
/// `Fan information` header, up to the next blank line or end of input.
static FAN_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Fan information[^\n]*\n-{10,}[ \t]*\r?\n(.*?)(?:\r?\n[ \t]*\r?\n|\z)")
        .expect("valid regex")
});
static FAN_SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(slow|fast|normal|max)\s+").expect("valid regex"));
static FAN_DIRECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+-to-\w+").expect("valid regex"));
static FAN_STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(ok|fail|fault|empty)\s+").expect("valid regex"));
static FAN_RPM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(\d+)\s*$").expect("valid regex"));

pub const FAN_SECTION: &str = "Fan information";

/// Parses `show environment fan`. Fails with `SectionNotFound` when the
/// `Fan information` table is absent instead of guessing at unrelated text.
pub fn parse_fan(output: &str) -> Result<ParseReport<FanRecord>, ParseError> {
    let table = FAN_SECTION_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .ok_or(ParseError::SectionNotFound {
            section: FAN_SECTION,
        })?;

    // Line numbers are reported relative to the whole output.
    let offset = output[..table.start()].lines().count();

    let mut report = ParseReport::new();
    for (line_no, line) in candidate_lines(table.as_str(), FAN_NOISE) {
        report.push_line(fan_line(line_no + offset, line));
    }
    Ok(report)
}

fn fan_line(line_no: usize, line: &str) -> Result<(String, FanRecord), FieldParseError> {
    let slot = find(&SENSOR_RE, line_no, line, "fan_slot")?;
    let speed = capture(&FAN_SPEED_RE, line_no, line, "speed")?;
    let status = capture(&FAN_STATUS_RE, line_no, line, "status")?;
    let rpm = capture(&FAN_RPM_RE, line_no, line, "rpm")?;
    let direction = FAN_DIRECTION_RE
        .find(line)
        .map(|m| m.as_str())
        .unwrap_or_default();
    let rpm = decimal_field(rpm, line_no, line, "rpm")?;

    Ok((
        slot.to_string(),
        FanRecord {
            slot: slot.to_string(),
            speed: speed.to_string(),
            direction: direction.to_string(),
            status: status.to_string(),
            rpm,
        },
    ))
}

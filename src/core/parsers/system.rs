//! Parsers for `show version`, `show memory` and `show cpu` on controllers
//! and Instant access points.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{candidate_lines, decimal_field, FieldParseError, ParseError, ParseReport};
use crate::core::transport::OsType;

/// Running software version, prefixed with the dialect, e.g.
/// `ArubaInstant-8.6.0.4_74969`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub version: String,
}

/// One memory pool, values in kilobytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    /// Pool name as printed (`Kb` for the whole box).
    pub kind: String,
    pub total: f64,
    pub used: f64,
    pub free: f64,
}

/// Utilization of one CPU (or the aggregate), in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuRecord {
    /// CPU name as printed before the colon, e.g. `cpu0`.
    pub kind: String,
    /// Sum of the user, nice and system columns.
    pub used: f64,
    pub idle: f64,
}

pub const VERSION_KEY: &str = "version";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*, Version (.+?)\s*$").expect("valid regex"));

/// Finds the first `..., Version X` line. The dialect is folded into the
/// version string because the same number means different things across
/// product families.
pub fn parse_version(os_type: OsType, output: &str) -> Result<ParseReport<VersionRecord>, ParseError> {
    let mut report = ParseReport::new();
    let version = output
        .lines()
        .find_map(|line| VERSION_RE.captures(line).and_then(|caps| caps.get(1)));
    if let Some(version) = version {
        report.insert(
            VERSION_KEY,
            VersionRecord {
                version: format!("{}-{}", os_type, version.as_str()),
            },
        );
    }
    Ok(report)
}

static CONTROLLER_MEMORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Memory \((\w+)\):\s*total:\s*(\S+),\s*used:\s*(\S+),\s*free:\s*(\S+)")
        .expect("valid regex")
});

/// Controller `show memory`:
///
/// ```text
/// Memory (Kb): total: 3908684, used: 1881172, free: 2027512
/// ```
pub fn parse_controller_memory(output: &str) -> Result<ParseReport<MemoryRecord>, ParseError> {
    let mut report = ParseReport::new();
    for (line_no, line) in candidate_lines(output, &["#"]) {
        if !line.contains("Memory (") {
            continue;
        }
        report.push_line(controller_memory_line(line_no, line));
    }
    Ok(report)
}

fn controller_memory_line(line_no: usize, line: &str) -> Result<(String, MemoryRecord), FieldParseError> {
    let caps = CONTROLLER_MEMORY_RE.captures(line).ok_or_else(|| {
        FieldParseError::new(line_no, line, "memory", "expected 'Memory (<unit>): total: N, used: N, free: N'")
    })?;
    let column = |i: usize, field: &'static str| -> Result<f64, FieldParseError> {
        let raw = caps
            .get(i)
            .map(|m| m.as_str().trim_end_matches(','))
            .ok_or_else(|| FieldParseError::new(line_no, line, field, "column missing"))?;
        let value = decimal_field(raw, line_no, line, field)?;
        non_negative(value, line_no, line, field)
    };
    let kind = caps.get(1).map(|m| m.as_str()).unwrap_or("Kb").to_string();
    let total = column(2, "total")?;
    let used = column(3, "used")?;
    let free = column(4, "free")?;

    Ok((kind.clone(), MemoryRecord { kind, total, used, free }))
}

static MEMINFO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(MemTotal|MemFree|MemAvailable):\s*(\S+)(?:\s*kB)?\s*$").expect("valid regex"));

/// Instant `show memory`, a `/proc/meminfo` rendering:
///
/// ```text
/// MemTotal:        1022404 kB
/// MemFree:          412380 kB
/// MemAvailable:     498632 kB
/// ```
///
/// Produces one `Kb` record where used = total - available.
pub fn parse_instant_memory(output: &str) -> Result<ParseReport<MemoryRecord>, ParseError> {
    let mut report = ParseReport::new();
    let mut total = None;
    let mut free = None;
    let mut available = None;
    let mut seen_line = None;

    for (line_no, line) in candidate_lines(output, &["#"]) {
        let Some(caps) = MEMINFO_RE.captures(line) else {
            continue;
        };
        let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        seen_line.get_or_insert((line_no, line));
        let field = match key.as_str() {
            "MemTotal" => "MemTotal",
            "MemFree" => "MemFree",
            _ => "MemAvailable",
        };
        let parsed = decimal_field(raw.as_str(), line_no, line, field)
            .and_then(|value| non_negative(value, line_no, line, field));
        match (parsed, field) {
            (Ok(value), "MemTotal") => total = Some(value),
            (Ok(value), "MemFree") => free = Some(value),
            (Ok(value), _) => available = Some(value),
            (Err(failure), _) => report.reject(failure),
        }
    }

    let Some((line_no, line)) = seen_line else {
        return Ok(report);
    };
    if let (Some(total), Some(free), Some(available)) = (total, free, available) {
        report.insert(
            "Kb",
            MemoryRecord {
                kind: "Kb".to_string(),
                total,
                used: (total - available).max(0.0),
                free,
            },
        );
        return Ok(report);
    }

    // Every absent value gets its own failure unless its line already failed.
    let missing: Vec<&'static str> = [("MemTotal", total), ("MemFree", free), ("MemAvailable", available)]
        .into_iter()
        .filter(|(field, value)| value.is_none() && !report.failures.iter().any(|f| f.field == *field))
        .map(|(field, _)| field)
        .collect();
    for field in missing {
        report.reject(FieldParseError::new(line_no, line, field, "line missing from output"));
    }
    Ok(report)
}

static INSTANT_CPU_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(.+?):\s*user\s*([\d.]+)%\s*nice\s*([\d.]+)%\s*system\s*([\d.]+)%\s*idle\s*([\d.]+)%\s*io\s*([\d.]+)%\s*irq\s*([\d.]+)%\s*softirq\s*([\d.]+)%",
    )
    .expect("valid regex")
});

/// Instant `show cpu`:
///
/// ```text
/// cpu0: user  4% nice  0% system  3% idle 92% io  0% irq  0% softirq  1%
/// ```
///
/// used = user + nice + system.
pub fn parse_instant_cpu(output: &str) -> Result<ParseReport<CpuRecord>, ParseError> {
    let mut report = ParseReport::new();
    for (line_no, line) in candidate_lines(output, &["#"]) {
        if !(line.contains("user") && line.contains("idle")) {
            continue;
        }
        report.push_line(instant_cpu_line(line_no, line));
    }
    Ok(report)
}

fn instant_cpu_line(line_no: usize, line: &str) -> Result<(String, CpuRecord), FieldParseError> {
    let caps = INSTANT_CPU_RE.captures(line).ok_or_else(|| {
        FieldParseError::new(line_no, line, "cpu", "expected '<cpu>: user N% nice N% system N% idle N% ...'")
    })?;
    let percent = |i: usize, field: &'static str| -> Result<f64, FieldParseError> {
        let raw = caps
            .get(i)
            .map(|m| m.as_str())
            .ok_or_else(|| FieldParseError::new(line_no, line, field, "column missing"))?;
        decimal_field(raw, line_no, line, field)
    };
    let kind = caps
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| FieldParseError::new(line_no, line, "type", "column missing"))?;
    let used = percent(2, "user")? + percent(3, "nice")? + percent(4, "system")?;
    let idle = percent(5, "idle")?;

    for (field, value) in [("used", used), ("idle", idle)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(FieldParseError::new(
                line_no,
                line,
                field,
                format!("{} is outside 0..=100 percent", value),
            ));
        }
    }

    Ok((kind.clone(), CpuRecord { kind, used, idle }))
}

fn non_negative(value: f64, line_no: usize, line: &str, field: &'static str) -> Result<f64, FieldParseError> {
    if value < 0.0 {
        Err(FieldParseError::new(line_no, line, field, "negative value"))
    } else {
        Ok(value)
    }
}

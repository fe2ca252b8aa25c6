//! Maps `(domain, dialect)` pairs to the parser that understands them.
//!
//! Not every device family exposes every metric domain. Asking for an
//! unsupported pair is an ordinary, recoverable outcome reported as
//! [`DialectError::DomainUnsupportedForDialect`].

use std::{collections::HashMap, fmt};

use serde::Serialize;
use thiserror::Error;

use super::{
    parsers::{
        environment::{self, FanRecord, PowerSupplyRecord, TemperatureRecord},
        system::{self, CpuRecord, MemoryRecord, VersionRecord},
        ParseError, ParseReport,
    },
    transport::OsType,
};

/// A parseable slice of a metric domain, each with its own command and
/// record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Domain {
    Temperature,
    PowerSupply,
    Fan,
    Version,
    Memory,
    Cpu,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Temperature => "temperature",
            Domain::PowerSupply => "power-supply",
            Domain::Fan => "fan",
            Domain::Version => "version",
            Domain::Memory => "memory",
            Domain::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed entity of any domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Temperature(TemperatureRecord),
    PowerSupply(PowerSupplyRecord),
    Fan(FanRecord),
    Version(VersionRecord),
    Memory(MemoryRecord),
    Cpu(CpuRecord),
}

/// A parser entry. The dialect is passed along for parsers that fold it
/// into their output.
pub type ParseFn = fn(OsType, &str) -> Result<ParseReport<Record>, ParseError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialectError {
    #[error("'{domain}' is not implemented for {os_type}")]
    DomainUnsupportedForDialect { os_type: OsType, domain: Domain },

    #[error("'{domain}' output from {os_type} could not be parsed: {source}")]
    Parse {
        os_type: OsType,
        domain: Domain,
        #[source]
        source: ParseError,
    },
}

/// Lookup table of parsers, built once and read concurrently afterwards.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    parsers: HashMap<(Domain, OsType), ParseFn>,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.parsers.keys().collect();
        keys.sort();
        f.debug_struct("DialectRegistry").field("parsers", &keys).finish()
    }
}

fn temperature(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    environment::parse_temperature(out).map(|r| r.map(Record::Temperature))
}

fn power_supply(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    environment::parse_power_supply(out).map(|r| r.map(Record::PowerSupply))
}

fn fan(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    environment::parse_fan(out).map(|r| r.map(Record::Fan))
}

fn version(os: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    system::parse_version(os, out).map(|r| r.map(Record::Version))
}

fn controller_memory(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    system::parse_controller_memory(out).map(|r| r.map(Record::Memory))
}

fn instant_memory(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    system::parse_instant_memory(out).map(|r| r.map(Record::Memory))
}

fn instant_cpu(_: OsType, out: &str) -> Result<ParseReport<Record>, ParseError> {
    system::parse_instant_cpu(out).map(|r| r.map(Record::Cpu))
}

impl DialectRegistry {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsers shipped with the crate.
    pub fn with_builtin_parsers() -> Self {
        let mut registry = Self::new();
        for os in [OsType::ArubaSwitch, OsType::ArubaCXSwitch] {
            registry.register(Domain::Temperature, os, temperature);
            registry.register(Domain::PowerSupply, os, power_supply);
            registry.register(Domain::Fan, os, fan);
        }
        for os in [OsType::ArubaController, OsType::ArubaInstant] {
            registry.register(Domain::Version, os, version);
        }
        registry.register(Domain::Memory, OsType::ArubaController, controller_memory);
        registry.register(Domain::Memory, OsType::ArubaInstant, instant_memory);
        registry.register(Domain::Cpu, OsType::ArubaInstant, instant_cpu);
        registry
    }

    /// Adds or replaces the parser for a pair.
    pub fn register(&mut self, domain: Domain, os_type: OsType, parser: ParseFn) -> &mut Self {
        self.parsers.insert((domain, os_type), parser);
        self
    }

    pub fn supports(&self, domain: Domain, os_type: OsType) -> bool {
        self.parsers.contains_key(&(domain, os_type))
    }

    pub fn resolve(&self, domain: Domain, os_type: OsType) -> Result<ParseFn, DialectError> {
        self.parsers
            .get(&(domain, os_type))
            .copied()
            .ok_or(DialectError::DomainUnsupportedForDialect { os_type, domain })
    }

    /// Parses `text` with the parser registered for the pair.
    ///
    /// Rejected lines stay inside the returned report. A report without a
    /// single record is turned into `ParseError::NoRecords`.
    pub fn dispatch(
        &self,
        domain: Domain,
        os_type: OsType,
        text: &str,
    ) -> Result<ParseReport<Record>, DialectError> {
        let parser = self.resolve(domain, os_type)?;
        let wrap = |source| DialectError::Parse {
            os_type,
            domain,
            source,
        };
        let report = parser(os_type, text).map_err(wrap)?;
        if report.is_empty() {
            return Err(wrap(ParseError::NoRecords {
                rejected: report.failures.len(),
            }));
        }
        Ok(report)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

//! Command-then-parse plumbing shared by all collectors.

use tracing::{debug, trace, warn};

use super::{error::CollectorError, types::CollectorResult};
use crate::core::{
    dialect::{DialectRegistry, Domain, Record},
    parsers::ParseReport,
    transport::Transport,
};

/// One CLI command of a domain and the dialect table entry that parses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub domain: Domain,
    pub command: &'static str,
}

impl Section {
    pub const fn new(domain: Domain, command: &'static str) -> Self {
        Section { domain, command }
    }
}

/// Runs every section the device's dialect supports and parses the output.
///
/// Unsupported sections are dropped before any command is sent. Commands all
/// run before parsing starts, so a transport failure leaves nothing
/// half-emitted. A section that fails to parse is logged and left out of the
/// result.
pub(crate) async fn run_sections(
    collector: &'static str,
    dialects: &DialectRegistry,
    sections: &[Section],
    transport: &dyn Transport,
    target: &str,
) -> CollectorResult<Vec<(Domain, ParseReport<Record>)>> {
    let os_type = transport.os_type();

    let supported: Vec<&Section> = sections
        .iter()
        .filter(|section| {
            let supported = dialects.supports(section.domain, os_type);
            if !supported {
                debug!(
                    "[{}] {}: skipping '{}', '{}' is not implemented for {}",
                    collector, target, section.command, section.domain, os_type
                );
            }
            supported
        })
        .collect();

    if supported.is_empty() {
        return Err(CollectorError::DomainUnsupportedForDialect { collector, os_type });
    }

    let mut outputs = Vec::with_capacity(supported.len());
    for section in supported {
        trace!("[{}] {}: running '{}'", collector, target, section.command);
        let output = transport
            .run_command(&[section.command])
            .await
            .map_err(|source| CollectorError::Transport { collector, source })?;
        outputs.push((section.domain, output));
    }

    let mut reports = Vec::with_capacity(outputs.len());
    for (domain, output) in outputs {
        match dialects.dispatch(domain, os_type, &output) {
            Ok(report) => {
                if !report.failures.is_empty() {
                    for failure in &report.failures {
                        debug!("[{}] {}: {}: {}", collector, target, domain, failure);
                    }
                    warn!(
                        "[{}] {}: {} line(s) of '{}' output skipped",
                        collector,
                        target,
                        report.failures.len(),
                        domain
                    );
                }
                reports.push((domain, report));
            }
            Err(e) => warn!("[{}] {}: {}", collector, target, e),
        }
    }

    Ok(reports)
}

use thiserror::Error;

use crate::core::{metrics::LabelCardinalityError, transport::{OsType, TransportError}};

/// Errors a collector reports to its caller.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// The session failed while running one of the domain's commands.
    /// The whole domain is abandoned for this scrape.
    #[error("Collector '{collector}' transport failure: {source}")]
    Transport {
        collector: &'static str,
        #[source]
        source: TransportError,
    },

    /// None of the domain's sections exist for this dialect.
    #[error("Collector '{collector}' is not implemented for {os_type}")]
    DomainUnsupportedForDialect {
        collector: &'static str,
        os_type: OsType,
    },

    /// An event did not line up with its descriptor.
    #[error(transparent)]
    Label(#[from] LabelCardinalityError),

    /// Tried to access a collector by name, but it was not registered.
    #[error("Collector not found for: {0}")]
    CollectorNotFound(String),
}

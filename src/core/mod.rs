//! Runtime components: device sessions, parsing, collectors and the scrape
//! executor.

pub mod collectors;
pub mod dialect;
pub mod executor;
pub mod metrics;
pub mod parsers;
pub mod transport;

use super::error::CollectorError;

/// Result alias for everything in the collector system.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;

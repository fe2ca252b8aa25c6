//! Metric domain collectors.
//!
//! * `environment`: temperature sensors, power supplies and fans.
//! * `system`: software version, memory pools and CPU utilization.

pub mod environment;
pub mod error;
pub mod registry;
pub mod section;
pub mod system;
pub mod traits;
pub mod types;

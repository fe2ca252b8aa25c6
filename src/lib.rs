//! switchbee, network switch CLI scraper and metric normalizer
//!
//! This crate runs `show ...` commands on Aruba devices of several OS
//! families through a pluggable transport, parses the free-form text those
//! commands print and turns it into labeled metric events. Which metric domains are scraped is
//! controlled per device by a two-level feature configuration.
//!
//! ## Modules
//!
//! * `config`: Configuration structures, loading, validation, and defaults.
//!   Supports TOML configuration files with validation via the `validator` crate.
//!   Global settings and feature toggles can be overridden per device.
//!
//! * `core`: Core runtime components:
//!   - `Transport` abstraction over device sessions, plus a replay transport
//!   - Per-dialect parsers and the `(domain, OS type)` dispatch table
//!   - Environment and system collectors and their registry
//!   - Scrape executor
//!
//! * `logger`: Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.

pub mod config;
pub mod core;
pub mod logger;

//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure that aggregates the
//! global connection defaults, the default feature toggles, the per-device
//! override blocks, and the logger settings. Configuration is read from TOML,
//! validated, and is intended to remain immutable thereafter.
//!
//! Override resolution (device value wins, global value otherwise) is never
//! applied at load time. It happens on lookup, see [`Config::effective_features`]
//! and [`Config::connection_settings`].

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use self::{device::DeviceConfig, features::FeatureSet, logger::LoggerConfig};

pub mod device;
pub mod features;
pub mod logger;

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::startup_timestamp()).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::startup_timestamp()).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::startup_timestamp()).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        )
    };
}

/// UTC timestamp used by the `print_*` macros. Falls back to an empty string
/// if formatting fails, the message itself is what matters at startup.
#[doc(hidden)]
pub fn startup_timestamp() -> String {
    let format = match time::format_description::parse(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z",
    ) {
        Ok(format) => format,
        Err(_) => return String::new(),
    };
    time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_default()
}

/// Environment variable that points at the configuration file.
pub const CONFIG_ENV: &str = "SWITCHBEE_CONFIG";

/// Path used when `SWITCHBEE_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/switchbee/config.toml";

/// Errors that can occur during configuration loading, parsing, or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The document is not valid TOML or does not match the expected shape.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Top-level exporter configuration.
///
/// Scalar fields are the global defaults every device inherits. `devices`
/// holds the per-host override blocks, unique by `host`.
#[derive(Serialize, Deserialize, Debug, Validate, Clone)]
#[serde(default)]
#[validate(schema(function = "validate_unique_hosts"))]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Allow legacy key exchange and cipher suites on the transport.
    pub legacy_ciphers: bool,

    /// Per-command timeout in seconds.
    #[validate(range(min = 1, message = "Timeout must be at least 1 second"))]
    pub timeout: u64,

    /// Maximum number of bytes read from a single command output.
    #[validate(range(min = 1, message = "Batch size must be at least 1"))]
    pub batch_size: usize,

    /// Default login name.
    pub username: String,

    /// Default password, if password authentication is used.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Default private key file, if key authentication is used.
    pub key_file: Option<PathBuf>,

    /// Prefix of every exported metric name.
    #[validate(length(min = 1, message = "Metric namespace must not be empty"))]
    pub namespace: String,

    /// Feature toggles applied to every device without an override.
    pub features: FeatureSet,

    /// Per-device override blocks.
    #[validate(nested)]
    pub devices: Vec<DeviceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logger: LoggerConfig::default(),
            legacy_ciphers: false,
            timeout: 5,
            batch_size: 10_000,
            username: String::new(),
            password: None,
            key_file: None,
            namespace: "aruba".to_string(),
            features: FeatureSet::all_enabled(),
            devices: Vec::new(),
        }
    }
}

/// Rejects configurations that list the same host twice.
fn validate_unique_hosts(config: &Config) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(config.devices.len());
    for device in &config.devices {
        if !seen.insert(device.host.as_str()) {
            let mut err = ValidationError::new("duplicate_host");
            err.message = Some(format!("Device '{}' is configured more than once", device.host).into());
            return Err(err);
        }
    }
    Ok(())
}

impl Config {
    /// Constructs a new configuration by locating and loading the config file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration file cannot be found,
    /// read, parsed, or validated.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load(&config_path)
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `SWITCHBEE_CONFIG` environment variable
    /// 2. `/etc/switchbee/config.toml`
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Ok(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::Config(
            "No configuration file found.".to_string(),
        ))
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(format!(
                "Configuration file does not exist: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// Keys missing from the document keep their [`Config::default`] values.
    /// Global toggles left out of a partial `[features]` table stay enabled.
    /// Either the whole document is accepted or an error is returned.
    pub fn from_toml_str(raw: &str) -> Result<Config, ConfigError> {
        let mut config: Config = toml::from_str(raw)?;
        config.features = config.features.merged_over(&FeatureSet::all_enabled());
        config.validate()?;
        Ok(config)
    }

    /// Splits a comma separated host list into skeleton device entries that
    /// carry no overrides. Whitespace around hosts is trimmed and empty
    /// entries are dropped.
    pub fn devices_from_host_list(hosts: &str) -> Vec<DeviceConfig> {
        hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(DeviceConfig::new)
            .collect()
    }

    /// Replaces the configured devices with skeleton entries for `hosts`.
    pub fn set_hosts(&mut self, hosts: &str) {
        self.devices = Self::devices_from_host_list(hosts);
    }

    /// Looks up the override block of a device. Linear: device lists are short.
    pub fn find_device(&self, host: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.host == host)
    }

    /// Hosts of all configured devices, in configuration order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|device| device.host.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::features::Feature;

    const FULL: &str = r#"
legacy_ciphers = true
timeout = 12
batch_size = 500
username = "monitor"
password = "secret"
namespace = "campus"

[logger]
level = "debug"

[features]
bgp = false

[[devices]]
host = "sw-core-1"
timeout = 30

[devices.features]
environment = false

[[devices]]
host = "ctrl-1"
username = "admin"
"#;

    #[test]
    fn default_config_seeds_documented_values() {
        let config = Config::default();

        assert_eq!(config.timeout, 5);
        assert_eq!(config.batch_size, 10_000);
        assert!(!config.legacy_ciphers);
        assert_eq!(config.namespace, "aruba");
        assert!(config.devices.is_empty());
        for feature in Feature::ALL {
            assert_eq!(config.features.get(feature), Some(true));
        }
    }

    #[test]
    fn full_document_is_parsed() {
        let config = Config::from_toml_str(FULL).expect("valid config");

        assert!(config.legacy_ciphers);
        assert_eq!(config.timeout, 12);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.username, "monitor");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.namespace, "campus");
        assert_eq!(config.logger.level, "debug");
        assert_eq!(config.features.bgp, Some(false));
        assert_eq!(config.features.system, Some(true));

        assert_eq!(config.devices.len(), 2);
        let core = config.find_device("sw-core-1").expect("device present");
        assert_eq!(core.timeout, Some(30));
        assert_eq!(
            core.features.as_ref().and_then(|f| f.environment),
            Some(false)
        );
        assert_eq!(core.features.as_ref().and_then(|f| f.system), None);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty config is valid");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.features, FeatureSet::all_enabled());
    }

    #[test]
    fn partial_features_table_keeps_other_toggles_enabled() {
        let config = Config::from_toml_str("[features]\nbgp = false\n").unwrap();

        let expected = FeatureSet {
            bgp: Some(false),
            ..FeatureSet::all_enabled()
        };
        assert_eq!(config.features, expected);
        assert_eq!(config.effective_features("unknown-host"), expected);
        for feature in Feature::ALL {
            assert!(config.effective_features("x").get(feature).is_some());
        }
    }

    #[test]
    fn loading_does_not_copy_global_toggles_into_devices() {
        let config = Config::from_toml_str(FULL).unwrap();
        let core = config.find_device("sw-core-1").unwrap();

        // Only the explicitly written toggle is present on the device block.
        let features = core.features.unwrap();
        assert_eq!(features.bgp, None);
        assert_eq!(features.interfaces, None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml_str("timeout = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn wrong_value_type_is_a_parse_error() {
        let err = Config::from_toml_str("timeout = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let err = Config::from_toml_str("timeout = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_device_timeout_fails_validation() {
        let raw = "[[devices]]\nhost = \"a\"\ntimeout = 0\n";
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn duplicate_hosts_fail_validation() {
        let raw = "[[devices]]\nhost = \"a\"\n[[devices]]\nhost = \"a\"\n";
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn empty_host_fails_validation() {
        let raw = "[[devices]]\nhost = \"\"\n";
        assert!(matches!(
            Config::from_toml_str(raw),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let raw = "[logger]\nlevel = \"loud\"\n";
        assert!(matches!(
            Config::from_toml_str(raw),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn devices_from_host_list_creates_skeletons() {
        let devices = Config::devices_from_host_list("sw1, sw2,,ctrl-1 ");

        let hosts: Vec<_> = devices.iter().map(|d| d.host.as_str()).collect();
        assert_eq!(hosts, vec!["sw1", "sw2", "ctrl-1"]);
        assert!(devices.iter().all(|d| d.features.is_none()
            && d.timeout.is_none()
            && d.username.is_none()));
    }

    #[test]
    fn set_hosts_replaces_devices() {
        let mut config = Config::from_toml_str(FULL).unwrap();
        config.set_hosts("a,b");
        assert_eq!(config.hosts().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = Config::load(file.path()).expect("loads from disk");
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn print_macros_work_in_expression_position() {
        for outcome in [Ok(1), Err("boom")] {
            match outcome {
                Ok(n) => print_info!("value {}", n),
                Err(e) if e.is_empty() => print_error!("empty error"),
                Err(e) => print_warn!("failed: {}", e),
            }
        }
    }
}

//! Per-device override blocks and resolved connection settings.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{features::FeatureSet, Config};

/// Configuration of one device. Every field except `host` is an override;
/// `None` means the global value applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceConfig {
    /// Address or name used to reach the device; unique across the config.
    #[validate(length(min = 1, message = "Device host must not be empty"))]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_ciphers: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Timeout must be at least 1 second"))]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Batch size must be at least 1"))]
    pub batch_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
}

impl DeviceConfig {
    /// A device entry with no overrides.
    pub fn new(host: impl Into<String>) -> Self {
        DeviceConfig {
            host: host.into(),
            ..DeviceConfig::default()
        }
    }
}

/// Connection parameters of one device after applying its overrides.
///
/// This is what a transport factory needs to open a session; the core never
/// opens sessions itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub legacy_ciphers: bool,
    pub timeout: Duration,
    pub batch_size: usize,
}

impl Config {
    /// Resolves connection parameters for `host`, field by field. Unknown
    /// hosts get the global values.
    pub fn connection_settings(&self, host: &str) -> ConnectionSettings {
        let device = self.find_device(host);

        ConnectionSettings {
            host: host.to_string(),
            username: device
                .and_then(|d| d.username.clone())
                .unwrap_or_else(|| self.username.clone()),
            password: device
                .and_then(|d| d.password.clone())
                .or_else(|| self.password.clone()),
            key_file: device
                .and_then(|d| d.key_file.clone())
                .or_else(|| self.key_file.clone()),
            legacy_ciphers: device
                .and_then(|d| d.legacy_ciphers)
                .unwrap_or(self.legacy_ciphers),
            timeout: Duration::from_secs(device.and_then(|d| d.timeout).unwrap_or(self.timeout)),
            batch_size: device.and_then(|d| d.batch_size).unwrap_or(self.batch_size),
        }
    }
}

//! Feature toggles and their two-level resolution.
//!
//! A [`FeatureSet`] exists at two scopes: the global `[features]` table and an
//! optional `[devices.features]` table per device. Each toggle is optional.
//! For a given host the effective value of a toggle is the device value when
//! present, else the global value. There is no third level.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Config;

/// One metric domain that can be switched on or off per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Bgp,
    Environment,
    Interfaces,
    Optics,
    System,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Bgp,
        Feature::Environment,
        Feature::Interfaces,
        Feature::Optics,
        Feature::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Bgp => "bgp",
            Feature::Environment => "environment",
            Feature::Interfaces => "interfaces",
            Feature::Optics => "optics",
            Feature::System => "system",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enabled/disabled state of each domain. `None` means "inherit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    pub bgp: Option<bool>,
    pub environment: Option<bool>,
    pub interfaces: Option<bool>,
    pub optics: Option<bool>,
    pub system: Option<bool>,
}

impl FeatureSet {
    /// Every toggle explicitly enabled.
    pub fn all_enabled() -> Self {
        FeatureSet {
            bgp: Some(true),
            environment: Some(true),
            interfaces: Some(true),
            optics: Some(true),
            system: Some(true),
        }
    }

    pub fn get(&self, feature: Feature) -> Option<bool> {
        match feature {
            Feature::Bgp => self.bgp,
            Feature::Environment => self.environment,
            Feature::Interfaces => self.interfaces,
            Feature::Optics => self.optics,
            Feature::System => self.system,
        }
    }

    pub fn set(&mut self, feature: Feature, value: Option<bool>) {
        let slot = match feature {
            Feature::Bgp => &mut self.bgp,
            Feature::Environment => &mut self.environment,
            Feature::Interfaces => &mut self.interfaces,
            Feature::Optics => &mut self.optics,
            Feature::System => &mut self.system,
        };
        *slot = value;
    }

    /// Whether the domain should be collected. A toggle left unset at every
    /// scope falls back to enabled, the same as the built-in defaults.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.get(feature).unwrap_or(true)
    }

    /// Field-by-field merge: each toggle set here wins, unset toggles are
    /// taken from `global`.
    pub fn merged_over(&self, global: &FeatureSet) -> FeatureSet {
        FeatureSet {
            bgp: self.bgp.or(global.bgp),
            environment: self.environment.or(global.environment),
            interfaces: self.interfaces.or(global.interfaces),
            optics: self.optics.or(global.optics),
            system: self.system.or(global.system),
        }
    }
}

impl Config {
    /// Effective feature toggles for `host`.
    ///
    /// Unknown hosts and devices without a `features` block get the global set
    /// unchanged. Otherwise the device block is merged over the global set.
    /// Pure: nothing is cached or written back.
    pub fn effective_features(&self, host: &str) -> FeatureSet {
        match self.find_device(host).and_then(|device| device.features.as_ref()) {
            Some(device_features) => device_features.merged_over(&self.features),
            None => self.features,
        }
    }
}

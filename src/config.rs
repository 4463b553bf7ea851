//! Platform configuration, as found in the bridge's `config.json` platform block.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::protocol::DEFAULT_BASE_URL;
use crate::{Error, Result};

pub const MIN_POLLING_SECS: u64 = 10;

fn default_name() -> String {
    "Tado".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_polling() -> u64 {
    MIN_POLLING_SECS
}

fn default_true() -> bool {
    true
}

/// Immutable snapshot of the feature flags. Every reconciliation decision is a
/// function of this plus the polled listing plus the registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_true")]
    pub radiator_thermostat: bool,
    #[serde(default)]
    pub boiler_thermostat: bool,
    #[serde(default)]
    pub remote_thermostat: bool,
    #[serde(default)]
    pub one_per_room: bool,
    #[serde(default)]
    pub external_sensor: bool,
    #[serde(default)]
    pub open_window: bool,
    #[serde(default)]
    pub occupancy: bool,
    #[serde(default)]
    pub weather: bool,
    #[serde(default)]
    pub solar_intensity: bool,
    #[serde(default)]
    pub central_switch: bool,
    /// Seconds between successful polls.
    #[serde(default = "default_polling", rename = "polling")]
    polling_secs: u64,
}

impl FeatureConfig {
    /// Config with default flags for the given account.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            username: username.into(),
            password: password.into(),
            base_url: default_base_url(),
            radiator_thermostat: true,
            boiler_thermostat: false,
            remote_thermostat: false,
            one_per_room: false,
            external_sensor: false,
            open_window: false,
            occupancy: false,
            weather: false,
            solar_intensity: false,
            central_switch: false,
            polling_secs: default_polling(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let de = &mut serde_json::Deserializer::from_str(json);
        let config: FeatureConfig = serde_path_to_error::deserialize(de)
            .map_err(|e| Error::Config(format!("{} at `{}`", e.inner(), e.path())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(Error::Config("username and password are required".to_string()));
        }
        Ok(())
    }

    /// Interval between successful polls, never below ten seconds.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_secs.max(MIN_POLLING_SECS))
    }

    pub fn with_polling_secs(mut self, secs: u64) -> Self {
        self.polling_secs = secs;
        self
    }
}

//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL, DEBUG_LOGGING, DEFAULT_TIME_UNIT_MS, MAX_TRIES,
    STUDIO_ENABLED, VERBOSE_LOGGING,
};
use crate::errors::{KeywardError, Result};
use crate::types::Value;

/// Configuration for one store handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace of the store in the remote service
    pub name: String,
    /// Milliseconds represented by one backoff / autosave time unit
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub settings: SettingsOverrides,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts per remote call
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

/// Optional replacements for the seeded setting values
///
/// Only values can be overridden; the set of setting names stays closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    pub auto_save_enabled: Option<bool>,
    pub auto_save_interval: Option<f64>,
    pub verbose_logging: Option<bool>,
    pub debug_logging: Option<bool>,
    pub studio_enabled: Option<bool>,
}

fn default_time_unit_ms() -> u64 {
    DEFAULT_TIME_UNIT_MS
}

fn default_max_tries() -> u32 {
    MAX_TRIES
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_tries: MAX_TRIES }
    }
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_unit_ms: DEFAULT_TIME_UNIT_MS,
            retry: RetrySettings::default(),
            settings: SettingsOverrides::default(),
        }
    }

    /// Duration of one time unit
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `KeywardError::Config` for an empty name, a zero time unit or
    /// a zero retry budget.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KeywardError::Config("store name must not be empty".to_string()));
        }
        if self.time_unit_ms == 0 {
            return Err(KeywardError::Config("time_unit_ms must be greater than 0".to_string()));
        }
        if self.retry.max_tries == 0 {
            return Err(KeywardError::Config("retry.max_tries must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl SettingsOverrides {
    /// Overridden values keyed by setting name
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        let mut entries = Vec::new();
        if let Some(enabled) = self.auto_save_enabled {
            entries.push((AUTO_SAVE_ENABLED, Value::Bool(enabled)));
        }
        if let Some(interval) = self.auto_save_interval {
            if let Some(number) = serde_json::Number::from_f64(interval) {
                entries.push((AUTO_SAVE_INTERVAL, Value::Number(number)));
            }
        }
        if let Some(verbose) = self.verbose_logging {
            entries.push((VERBOSE_LOGGING, Value::Bool(verbose)));
        }
        if let Some(debug) = self.debug_logging {
            entries.push((DEBUG_LOGGING, Value::Bool(debug)));
        }
        if let Some(studio) = self.studio_enabled {
            entries.push((STUDIO_ENABLED, Value::Bool(studio)));
        }
        entries
    }
}

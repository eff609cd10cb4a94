//! Settings store for one store handle
//!
//! A fixed set of named options, seeded at construction. Values are not type
//! checked. Every successful `set` notifies the subscribers of that name, even
//! when the value did not change.
//!
//! # Dispatch
//!
//! Notifications are fire-and-forget: inside a tokio runtime each callback
//! runs on its own spawned task, so `set` returns before any callback runs
//! and callbacks for one change (or for successive changes) run in no
//! particular order. Without a runtime the callbacks run inline before `set`
//! returns. Subscribers that need the latest state should read it from the
//! store rather than trust the order of notifications.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use keyward_domain::constants::{
    AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL, DEBUG_LOGGING, DEFAULT_AUTO_SAVE_ENABLED,
    DEFAULT_AUTO_SAVE_INTERVAL, DEFAULT_DEBUG_LOGGING, DEFAULT_STUDIO_ENABLED,
    DEFAULT_VERBOSE_LOGGING, STUDIO_ENABLED, VERBOSE_LOGGING,
};
use keyward_domain::{KeywardError, Result, SettingsOverrides, Value};
use parking_lot::RwLock;
use tracing::debug;

/// Callback invoked with the new value of a setting
pub type SettingCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Settings mapping with per-name subscriber lists
pub struct Settings {
    values: RwLock<BTreeMap<String, Value>>,
    subscribers: RwLock<HashMap<String, Vec<SettingCallback>>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings").field("values", &*self.values.read()).finish_non_exhaustive()
    }
}

impl Settings {
    /// Create a settings store seeded with the default values
    pub fn new() -> Self {
        let values = BTreeMap::from([
            (AUTO_SAVE_ENABLED.to_string(), Value::Bool(DEFAULT_AUTO_SAVE_ENABLED)),
            (AUTO_SAVE_INTERVAL.to_string(), Value::from(DEFAULT_AUTO_SAVE_INTERVAL)),
            (VERBOSE_LOGGING.to_string(), Value::Bool(DEFAULT_VERBOSE_LOGGING)),
            (DEBUG_LOGGING.to_string(), Value::Bool(DEFAULT_DEBUG_LOGGING)),
            (STUDIO_ENABLED.to_string(), Value::Bool(DEFAULT_STUDIO_ENABLED)),
        ]);

        Self { values: RwLock::new(values), subscribers: RwLock::new(HashMap::new()) }
    }

    /// Create a settings store whose seed values are replaced by `overrides`
    ///
    /// Seeding does not notify anyone: there are no subscribers yet.
    pub fn with_overrides(overrides: &SettingsOverrides) -> Self {
        let settings = Self::new();
        {
            let mut values = settings.values.write();
            for (name, value) in overrides.entries() {
                values.insert(name.to_string(), value);
            }
        }
        settings
    }

    /// Whether `name` belongs to the recognised set
    pub fn is_recognized(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    /// Overwrite a setting and notify its subscribers
    ///
    /// # Errors
    /// Returns `KeywardError::UnknownSetting` if `name` is not recognised; the
    /// mapping is left unchanged and nobody is notified.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        {
            let mut values = self.values.write();
            let slot = values.get_mut(name).ok_or_else(|| KeywardError::unknown_setting(name))?;
            *slot = value.clone();
        }

        let callbacks = self.subscribers.read().get(name).cloned().unwrap_or_default();
        debug!(setting = name, subscribers = callbacks.len(), "Setting changed");
        dispatch(callbacks, value);
        Ok(())
    }

    /// Snapshot of the full mapping
    pub fn get(&self) -> BTreeMap<String, Value> {
        self.values.read().clone()
    }

    /// Current value of one setting
    pub fn get_value(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    /// Current truthiness of one setting; unknown names are false
    pub fn is_enabled(&self, name: &str) -> bool {
        self.values.read().get(name).is_some_and(is_truthy)
    }

    /// Register `callback` for every future change of `name`
    ///
    /// # Errors
    /// Returns `KeywardError::UnknownSetting` if `name` is not recognised.
    pub fn subscribe<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        if !self.is_recognized(name) {
            return Err(KeywardError::unknown_setting(name));
        }
        self.subscribers.write().entry(name.to_string()).or_default().push(Arc::new(callback));
        Ok(())
    }

    /// Number of callbacks subscribed to `name`
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers.read().get(name).map_or(0, Vec::len)
    }
}

/// Truthiness of a setting value: `null` and `false` are false, anything
/// else is true
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        _ => true,
    }
}

fn dispatch(callbacks: Vec<SettingCallback>, value: Value) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            for callback in callbacks {
                let value = value.clone();
                runtime.spawn(async move { callback(value) });
            }
        }
        Err(_) => {
            for callback in callbacks {
                callback(value.clone());
            }
        }
    }
}

//! Caller-facing store handle
//!
//! A `Store` ties one cache, one settings store, one autosave scheduler and
//! one retry configuration to a remote namespace. Its methods never fail:
//! remote exhaustion and invalid setting names are logged as warnings and the
//! call degrades to "no value" or a no-op. Callers that need the typed result
//! can go through [`Store::cache`] and [`Store::settings_store`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use keyward_common::resilience::{JitterSource, RetryConfig, RetryExecutor};
use keyward_domain::constants::{DEFAULT_TIME_UNIT_MS, MAX_TRIES};
use keyward_domain::{Key, KeywardError, Result, SettingsOverrides, StoreConfig, Value};
use tracing::info;

use crate::cache::{Cache, SaveReport};
use crate::diagnostics::Diagnostics;
use crate::ports::{EnvironmentProbe, RemoteStore};
use crate::scheduler::{AutosaveScheduler, SchedulerState};
use crate::settings::Settings;

/// Builder for [`Store`]
pub struct StoreBuilder {
    name: String,
    remote: Arc<dyn RemoteStore>,
    environment: Arc<dyn EnvironmentProbe>,
    time_unit: Duration,
    max_tries: u32,
    retry_config: Option<RetryConfig>,
    jitter_source: Option<Arc<dyn JitterSource>>,
    overrides: SettingsOverrides,
}

impl StoreBuilder {
    fn new(name: String, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            name,
            remote,
            environment: Arc::new(|| false),
            time_unit: Duration::from_millis(DEFAULT_TIME_UNIT_MS),
            max_tries: MAX_TRIES,
            retry_config: None,
            jitter_source: None,
            overrides: SettingsOverrides::default(),
        }
    }

    /// Environment consulted by the write gate; production by default
    pub fn environment(mut self, environment: Arc<dyn EnvironmentProbe>) -> Self {
        self.environment = environment;
        self
    }

    /// Duration of one backoff / autosave time unit
    pub fn time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Attempts per remote call
    pub fn max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Replace the derived retry configuration entirely
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Replace the randomness behind retry jitter
    pub fn jitter_source(mut self, source: Arc<dyn JitterSource>) -> Self {
        self.jitter_source = Some(source);
        self
    }

    /// Seed values replacing the setting defaults
    pub fn settings(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Assemble the store and arm the scheduler if autosave is seeded on
    ///
    /// # Errors
    /// Returns `KeywardError::Config` for an empty name, a zero time unit or
    /// an invalid retry configuration.
    pub fn build(self) -> Result<Store> {
        if self.name.trim().is_empty() {
            return Err(KeywardError::Config("store name must not be empty".to_string()));
        }
        if self.time_unit.is_zero() {
            return Err(KeywardError::Config("time unit must be greater than 0".to_string()));
        }

        let retry_config = match self.retry_config {
            Some(config) => config,
            None => RetryConfig::builder()
                .max_attempts(self.max_tries)
                .unit_exponential_backoff(self.time_unit)
                .additive_jitter(self.time_unit)
                .build()
                .map_err(|err| KeywardError::Config(err.to_string()))?,
        };
        let mut retrier = RetryExecutor::always(retry_config);
        if let Some(source) = self.jitter_source {
            retrier = retrier.with_jitter_source(source);
        }

        let settings = Arc::new(Settings::with_overrides(&self.overrides));
        let diagnostics = Diagnostics::new(self.name.clone(), &settings);
        let cache = Arc::new(Cache::new(
            self.name.clone(),
            self.remote,
            self.environment,
            Arc::clone(&settings),
            retrier,
            Arc::clone(&diagnostics),
        ));
        let scheduler = AutosaveScheduler::start(
            Arc::clone(&cache),
            Arc::clone(&settings),
            Arc::clone(&diagnostics),
            self.time_unit,
        )?;

        info!(store = %self.name, "Store opened");
        Ok(Store { name: self.name, settings, diagnostics, cache, scheduler })
    }
}

/// Handle for one remote namespace
///
/// Dropping the handle cancels autosave without a final flush; call
/// [`Store::close`] to flush.
pub struct Store {
    name: String,
    settings: Arc<Settings>,
    diagnostics: Arc<Diagnostics>,
    cache: Arc<Cache>,
    scheduler: Arc<AutosaveScheduler>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Start building a store named `name` over `remote`
    pub fn builder(name: impl Into<String>, remote: Arc<dyn RemoteStore>) -> StoreBuilder {
        StoreBuilder::new(name.into(), remote)
    }

    /// Build a store from a validated configuration
    ///
    /// # Errors
    /// Returns `KeywardError::Config` if the configuration is invalid.
    pub fn from_config(
        config: &StoreConfig,
        remote: Arc<dyn RemoteStore>,
        environment: Arc<dyn EnvironmentProbe>,
    ) -> Result<Self> {
        config.validate()?;
        Self::builder(config.name.clone(), remote)
            .environment(environment)
            .time_unit(config.time_unit())
            .max_tries(config.retry.max_tries)
            .settings(config.settings.clone())
            .build()
    }

    /// Namespace of this store
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached value, loaded from the remote on a miss
    ///
    /// Returns `None` both for a key the remote does not hold and for a load
    /// that exhausted its retries.
    pub async fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        match self.cache.get(&key).await {
            Ok(value) => value,
            Err(error) => {
                self.diagnostics.warn(format_args!("Failed to load key {key}: {error}"));
                None
            }
        }
    }

    /// Stage a value; persisted by the next save
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.cache.set(key.into(), value.into());
    }

    /// Refresh `key` from the remote, bypassing the cache
    pub async fn load(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        match self.cache.load(&key).await {
            Ok(value) => value,
            Err(error) => {
                self.diagnostics.warn(format_args!("Failed to load key {key}: {error}"));
                None
            }
        }
    }

    /// Persist one key, or everything when `key` is `None`
    pub async fn save(&self, key: Option<Key>) -> SaveReport {
        self.cache.save(key.as_ref()).await
    }

    /// Persist a single key
    pub async fn save_key(&self, key: impl Into<Key>) -> SaveReport {
        self.save(Some(key.into())).await
    }

    /// Persist every cached key
    pub async fn save_all(&self) -> SaveReport {
        self.save(None).await
    }

    /// Snapshot of all settings
    pub fn settings(&self) -> BTreeMap<String, Value> {
        self.settings.get()
    }

    /// Current value of one setting
    pub fn setting(&self, name: &str) -> Option<Value> {
        self.settings.get_value(name)
    }

    /// Change a setting; unknown names are logged and ignored
    pub fn set_setting(&self, name: &str, value: impl Into<Value>) {
        if let Err(error) = self.settings.set(name, value) {
            self.diagnostics.warn(error);
        }
    }

    /// Subscribe to a setting; unknown names are logged and ignored
    pub fn subscribe<F>(&self, name: &str, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        if let Err(error) = self.settings.subscribe(name, callback) {
            self.diagnostics.warn(error);
        }
    }

    /// Underlying settings store
    pub fn settings_store(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Underlying cache
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Whether autosave is currently armed
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Autosave flushes completed so far
    pub fn autosave_ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    /// Stop autosave, then flush every cached key
    pub async fn close(self) -> SaveReport {
        if let Err(error) = self.scheduler.shutdown().await {
            self.diagnostics.warn(format_args!("Autosave did not stop cleanly: {error}"));
        }
        let report = self.cache.save(None).await;
        info!(
            store = %self.name,
            saved = report.saved.len(),
            failed = report.failed.len(),
            "Store closed"
        );
        report
    }
}

//! Write-back key/value cache in front of a remote store
//!
//! Writes stay in memory until a save persists them; a successful save evicts
//! the entry so the next read goes back to the remote. Every remote call runs
//! through the retrier.
//!
//! Each entry carries a generation bumped on every `set`. A save only evicts
//! an entry whose generation is unchanged since the save read it, so a write
//! that lands while its key is being persisted survives until the next save.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use keyward_common::resilience::{RetryError, RetryExecutor};
use keyward_domain::constants::STUDIO_ENABLED;
use keyward_domain::{Key, KeywardError, Result, Value};
use parking_lot::Mutex;
use tracing::instrument;

use crate::diagnostics::Diagnostics;
use crate::ports::{EnvironmentProbe, RemoteStore};
use crate::settings::Settings;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    generation: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Key, CacheEntry>,
    next_generation: u64,
}

impl CacheState {
    fn insert(&mut self, key: Key, value: Value) {
        self.next_generation += 1;
        self.entries.insert(key, CacheEntry { value, generation: self.next_generation });
    }
}

/// Per-key result of a save
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    /// Persisted and evicted
    pub saved: Vec<Key>,
    /// Persisted, but rewritten during the save, so kept dirty
    pub superseded: Vec<Key>,
    /// Not persisted; still cached
    pub failed: Vec<(Key, KeywardError)>,
    /// The environment gate blocked the save; nothing was attempted
    pub gated: bool,
}

impl SaveReport {
    fn gated() -> Self {
        Self { gated: true, ..Self::default() }
    }

    /// No key failed and the gate did not block the save
    pub fn is_success(&self) -> bool {
        !self.gated && self.failed.is_empty()
    }

    /// Number of keys a remote write was attempted for
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.superseded.len() + self.failed.len()
    }
}

enum EntryOutcome {
    Saved,
    Superseded,
    Failed(KeywardError),
    Missing,
}

/// In-memory cache for one store namespace
pub struct Cache {
    name: String,
    remote: Arc<dyn RemoteStore>,
    environment: Arc<dyn EnvironmentProbe>,
    settings: Arc<Settings>,
    retrier: RetryExecutor,
    diagnostics: Arc<Diagnostics>,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("entries", &self.len())
            .field("retrier", &self.retrier)
            .finish_non_exhaustive()
    }
}

impl Cache {
    /// Create an empty cache writing through `remote`
    pub fn new(
        name: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
        environment: Arc<dyn EnvironmentProbe>,
        settings: Arc<Settings>,
        retrier: RetryExecutor,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            name: name.into(),
            remote,
            environment,
            settings,
            retrier,
            diagnostics,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Stage `value` under `key`; never touches the remote
    pub fn set(&self, key: Key, value: Value) {
        self.diagnostics.debug(format_args!("Staged key {key}"));
        self.state.lock().insert(key, value);
    }

    /// Cached value for `key`, without falling back to the remote
    pub fn peek(&self, key: &Key) -> Option<Value> {
        self.state.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    /// Cached value for `key`, loading it from the remote on a miss
    ///
    /// # Errors
    /// See [`Cache::load`].
    pub async fn get(&self, key: &Key) -> Result<Option<Value>> {
        if let Some(value) = self.peek(key) {
            return Ok(Some(value));
        }
        self.load(key).await
    }

    /// Fetch `key` from the remote and overwrite the cached entry with it
    ///
    /// A remote "absent" removes the cached entry.
    ///
    /// # Errors
    /// Returns `KeywardError::RetriesExhausted` when every attempt failed; the
    /// cached entry is left as it was.
    #[instrument(skip(self), fields(store = %self.name))]
    pub async fn load(&self, key: &Key) -> Result<Option<Value>> {
        let fetched = self
            .retrier
            .execute(|| self.remote.get(key))
            .await
            .map_err(retry_failure)?;

        let mut state = self.state.lock();
        match &fetched {
            Some(value) => state.insert(key.clone(), value.clone()),
            None => {
                state.entries.remove(key);
            }
        }
        drop(state);

        self.diagnostics.debug(format_args!("Loaded key {key}"));
        Ok(fetched)
    }

    /// Persist one key, or every cached key when `key` is `None`
    ///
    /// Successes are evicted, failures stay cached. A full save writes the
    /// keys concurrently and tolerates partial failure. When the environment
    /// gate is closed nothing is written and the report is marked gated.
    #[instrument(skip(self), fields(store = %self.name))]
    pub async fn save(&self, key: Option<&Key>) -> SaveReport {
        if self.is_write_gated() {
            self.diagnostics.warn(KeywardError::WriteGated { store: self.name.clone() });
            return SaveReport::gated();
        }

        let keys = match key {
            Some(key) => vec![key.clone()],
            None => self.dirty_keys(),
        };

        let outcomes = join_all(keys.iter().map(|key| self.save_entry(key))).await;

        let mut report = SaveReport::default();
        for (key, outcome) in keys.into_iter().zip(outcomes) {
            match outcome {
                EntryOutcome::Saved => {
                    self.diagnostics.info(format_args!("Saved key {key}"));
                    report.saved.push(key);
                }
                EntryOutcome::Superseded => {
                    self.diagnostics.debug(format_args!("Key {key} changed during save"));
                    report.superseded.push(key);
                }
                EntryOutcome::Failed(error) => {
                    self.diagnostics.warn(format_args!("Failed to save key {key}: {error}"));
                    report.failed.push((key, error));
                }
                EntryOutcome::Missing => {}
            }
        }
        report
    }

    async fn save_entry(&self, key: &Key) -> EntryOutcome {
        let Some(snapshot) = self.state.lock().entries.get(key).cloned() else {
            return EntryOutcome::Missing;
        };

        if let Err(error) = self.retrier.execute(|| self.remote.put(key, &snapshot.value)).await {
            return EntryOutcome::Failed(retry_failure(error));
        }

        let mut state = self.state.lock();
        match state.entries.get(key) {
            Some(entry) if entry.generation != snapshot.generation => EntryOutcome::Superseded,
            Some(_) => {
                state.entries.remove(key);
                EntryOutcome::Saved
            }
            None => EntryOutcome::Saved,
        }
    }

    /// Whether saves are currently blocked by the environment gate
    pub fn is_write_gated(&self) -> bool {
        self.environment.is_non_production() && !self.settings.is_enabled(STUDIO_ENABLED)
    }

    /// Number of cached (dirty) entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing is waiting to be saved
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Whether `key` is cached
    pub fn contains(&self, key: &Key) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Cached keys in ascending order
    pub fn dirty_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.state.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Collapse a retrier failure into the domain error
pub fn retry_failure(error: RetryError<KeywardError>) -> KeywardError {
    match error {
        RetryError::Exhausted { attempts, last_error } => {
            KeywardError::RetriesExhausted { attempts, last_error: last_error.to_string() }
        }
        RetryError::NonRetryable { error, .. } => error,
        RetryError::InvalidConfiguration { message } => KeywardError::Config(message),
    }
}

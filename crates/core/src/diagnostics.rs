//! Leveled, store-scoped diagnostics
//!
//! Info messages follow `VerboseLogging`, debug messages follow
//! `DebugLogging`, warnings are always emitted. Every event carries the store
//! name as its `store` field.
//!
//! The gates are read from the settings store on every call. Change
//! notifications arrive in no particular order, so caching the notified value
//! could leave a gate stuck on a stale setting.

use std::fmt::Display;
use std::sync::Arc;

use keyward_domain::constants::{DEBUG_LOGGING, VERBOSE_LOGGING};

use crate::settings::Settings;

/// Diagnostics sink for one store
#[derive(Debug)]
pub struct Diagnostics {
    store: String,
    settings: Arc<Settings>,
}

impl Diagnostics {
    /// Create a sink gated by the current values in `settings`
    pub fn new(store: impl Into<String>, settings: &Arc<Settings>) -> Arc<Self> {
        Arc::new(Self { store: store.into(), settings: Arc::clone(settings) })
    }

    /// Store name attached to every event
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Whether `VerboseLogging` is currently truthy
    pub fn verbose_enabled(&self) -> bool {
        self.settings.is_enabled(VERBOSE_LOGGING)
    }

    /// Whether `DebugLogging` is currently truthy
    pub fn debug_enabled(&self) -> bool {
        self.settings.is_enabled(DEBUG_LOGGING)
    }

    /// Emit an info event if verbose logging is on
    pub fn info(&self, message: impl Display) {
        if self.verbose_enabled() {
            tracing::info!(store = %self.store, "{message}");
        }
    }

    /// Emit a debug event if debug logging is on
    pub fn debug(&self, message: impl Display) {
        if self.debug_enabled() {
            tracing::debug!(store = %self.store, "{message}");
        }
    }

    /// Emit a warning
    pub fn warn(&self, message: impl Display) {
        tracing::warn!(store = %self.store, "{message}");
    }
}

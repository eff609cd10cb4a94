//! # Keyward Core
//!
//! Store logic: the cache, settings, diagnostics and autosave scheduler, and
//! the caller-facing `Store` handle that ties them together.
//!
//! This crate contains:
//! - Port interfaces (traits) for the remote store and the environment
//! - The write-back cache and its save reports
//! - The closed settings store with fire-and-forget subscriptions
//! - The autosave scheduler
//!
//! ## Architecture Principles
//! - Only depends on `keyward-common` and `keyward-domain`
//! - No concrete remote or environment code
//! - All external dependencies via traits

pub mod cache;
pub mod diagnostics;
pub mod ports;
pub mod scheduler;
pub mod settings;
pub mod store;

#[cfg(test)]
mod test_support;

pub use cache::{Cache, SaveReport};
pub use diagnostics::Diagnostics;
pub use ports::{EnvironmentProbe, RemoteStore};
pub use scheduler::{AutosaveScheduler, SchedulerState};
pub use settings::{is_truthy, SettingCallback, Settings};
pub use store::{Store, StoreBuilder};

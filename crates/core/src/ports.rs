//! Port interfaces for the collaborators a store depends on
//!
//! The remote key-value service and the host environment are both outside
//! the core. Adapters live in `keyward-infra`; tests provide their own.

use async_trait::async_trait;
use keyward_domain::{Key, Result, Value};

/// Remote key-value service backing one store namespace
///
/// Calls may be slow and may fail transiently. `put` is an overwrite by key
/// and must be safe to repeat: the retrier re-invokes it after failures.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the value stored under `key`; `Ok(None)` when nothing is stored
    async fn get(&self, key: &Key) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &Key, value: &Value) -> Result<()>;
}

/// Answers whether the process runs outside production (development,
/// offline or studio mode)
///
/// Only consulted by the save gate; reads are never gated.
pub trait EnvironmentProbe: Send + Sync {
    fn is_non_production(&self) -> bool;
}

impl<F> EnvironmentProbe for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_non_production(&self) -> bool {
        self()
    }
}

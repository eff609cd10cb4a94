//! Scripted collaborators shared by the unit tests of this crate

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyward_common::resilience::{FixedJitter, RetryConfig, RetryExecutor};
use keyward_domain::{Key, KeywardError, Result, Value};
use parking_lot::Mutex;

use crate::ports::{EnvironmentProbe, RemoteStore};

/// Remote store whose failures and latency are scripted by the test
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    data: Mutex<HashMap<Key, Value>>,
    get_failures: AtomicU32,
    put_failures: AtomicU32,
    get_calls: AtomicU32,
    put_calls: AtomicU32,
    put_latency: Mutex<Duration>,
    broken_keys: Mutex<HashSet<Key>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.data.lock().insert(key.into(), value.into());
    }

    pub fn stored(&self, key: impl Into<Key>) -> Option<Value> {
        self.data.lock().get(&key.into()).cloned()
    }

    /// Fail the next `n` gets
    pub fn fail_gets(&self, n: u32) {
        self.get_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` puts
    pub fn fail_puts(&self, n: u32) {
        self.put_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every put of `key`
    pub fn break_key(&self, key: impl Into<Key>) {
        self.broken_keys.lock().insert(key.into());
    }

    pub fn set_put_latency(&self, latency: Duration) {
        *self.put_latency.lock() = latency;
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u32 {
        self.get_calls() + self.put_calls()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.get_failures) {
            return Err(KeywardError::remote("get throttled"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &Key, value: &Value) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.put_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.broken_keys.lock().contains(key) || Self::take_failure(&self.put_failures) {
            return Err(KeywardError::remote("put throttled"));
        }
        self.data.lock().insert(key.clone(), value.clone());
        Ok(())
    }
}

/// Environment probe with a switchable answer
#[derive(Debug, Default)]
pub struct SwitchableEnvironment(AtomicBool);

impl SwitchableEnvironment {
    pub fn production() -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(false)))
    }

    pub fn non_production() -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(true)))
    }

    /// Flip the answer seen by later gate checks
    pub fn set_non_production(&self, non_production: bool) {
        self.0.store(non_production, Ordering::SeqCst);
    }
}

impl EnvironmentProbe for SwitchableEnvironment {
    fn is_non_production(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Retrier with one-second units and a fixed half-unit jitter
pub fn fixed_retrier() -> RetryExecutor {
    RetryExecutor::always(RetryConfig::with_time_unit(Duration::from_secs(1)))
        .with_jitter_source(Arc::new(FixedJitter(0.5)))
}

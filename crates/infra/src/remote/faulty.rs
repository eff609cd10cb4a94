//! Fault-injecting remote store wrapper
//!
//! Emulates a service that throttles or drops requests: the next `n` gets or
//! puts fail, or every call fails while an outage is on. Optional latency is
//! applied before each call.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyward_core::RemoteStore;
use keyward_domain::{Key, KeywardError, Result, Value};
use tracing::debug;

/// Wraps a remote store and fails calls on demand
#[derive(Debug)]
pub struct FaultyRemoteStore<S> {
    inner: Arc<S>,
    latency: Duration,
    get_failures: AtomicU32,
    put_failures: AtomicU32,
    outage: AtomicBool,
    injected: AtomicU64,
}

impl<S: RemoteStore> FaultyRemoteStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            latency: Duration::ZERO,
            get_failures: AtomicU32::new(0),
            put_failures: AtomicU32::new(0),
            outage: AtomicBool::new(false),
            injected: AtomicU64::new(0),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Fail the next `n` gets
    pub fn fail_next_gets(&self, n: u32) {
        self.get_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` puts
    pub fn fail_next_puts(&self, n: u32) {
        self.put_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call until switched off
    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    /// Number of calls failed on purpose so far
    pub fn injected_failures(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    async fn before_call(&self, pending: &AtomicU32, operation: &str, key: &Key) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted =
            pending.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if scripted || self.outage.load(Ordering::SeqCst) {
            self.injected.fetch_add(1, Ordering::SeqCst);
            debug!(operation, %key, "Injected remote failure");
            return Err(KeywardError::remote(format!("{operation} {key}: request throttled")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for FaultyRemoteStore<S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.before_call(&self.get_failures, "get", key).await?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &Key, value: &Value) -> Result<()> {
        self.before_call(&self.put_failures, "put", key).await?;
        self.inner.put(key, value).await
    }
}

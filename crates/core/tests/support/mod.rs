//! Shared test helpers for `keyward-core` integration tests.
//!
//! A remote store that records every call and can be told to fail, so store
//! tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use keyward_common::resilience::FixedJitter;
use keyward_core::{RemoteStore, Store};
use keyward_domain::{Key, KeywardError, Result as DomainResult, Value};
use parking_lot::Mutex;

/// One recorded remote call
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Get(Key),
    Put(Key, Value),
}

/// In-memory remote that logs calls and fails the first N of each kind
#[derive(Debug, Default)]
pub struct RecordingRemote {
    data: Mutex<HashMap<Key, Value>>,
    calls: Mutex<Vec<RemoteCall>>,
    pending_get_failures: Mutex<u32>,
    pending_put_failures: Mutex<u32>,
}

impl RecordingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_value(self: Arc<Self>, key: impl Into<Key>, value: impl Into<Value>) -> Arc<Self> {
        self.data.lock().insert(key.into(), value.into());
        self
    }

    pub fn fail_next_gets(&self, n: u32) {
        *self.pending_get_failures.lock() = n;
    }

    pub fn fail_next_puts(&self, n: u32) {
        *self.pending_put_failures.lock() = n;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub fn put_count(&self) -> usize {
        self.calls.lock().iter().filter(|call| matches!(call, RemoteCall::Put(..))).count()
    }

    pub fn get_count(&self) -> usize {
        self.calls.lock().iter().filter(|call| matches!(call, RemoteCall::Get(_))).count()
    }

    pub fn stored(&self, key: impl Into<Key>) -> Option<Value> {
        self.data.lock().get(&key.into()).cloned()
    }

    fn take_failure(counter: &Mutex<u32>) -> bool {
        let mut remaining = counter.lock();
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn get(&self, key: &Key) -> DomainResult<Option<Value>> {
        self.calls.lock().push(RemoteCall::Get(key.clone()));
        if Self::take_failure(&self.pending_get_failures) {
            return Err(KeywardError::remote("request throttled"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &Key, value: &Value) -> DomainResult<()> {
        self.calls.lock().push(RemoteCall::Put(key.clone(), value.clone()));
        if Self::take_failure(&self.pending_put_failures) {
            return Err(KeywardError::remote("request throttled"));
        }
        self.data.lock().insert(key.clone(), value.clone());
        Ok(())
    }
}

/// Production store over `remote` with a deterministic half-unit jitter
pub fn players_store(remote: &Arc<RecordingRemote>) -> Store {
    Store::builder("Players", remote.clone())
        .jitter_source(Arc::new(FixedJitter(0.5)))
        .build()
        .expect("store should build")
}

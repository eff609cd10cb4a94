//! In-memory remote store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use keyward_core::RemoteStore;
use keyward_domain::{Key, Result, Value};
use parking_lot::RwLock;
use tracing::trace;

/// Call counters of a remote store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteStats {
    pub gets: u64,
    pub puts: u64,
}

/// Remote store keeping one namespace in a hash map
///
/// Never fails. Wrap it in a [`FaultyRemoteStore`](super::FaultyRemoteStore)
/// to emulate an unreliable service.
#[derive(Debug)]
pub struct InMemoryRemoteStore {
    namespace: String,
    data: RwLock<HashMap<Key, Value>>,
    gets: AtomicU64,
    puts: AtomicU64,
}

impl InMemoryRemoteStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            data: RwLock::new(HashMap::new()),
            gets: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    /// Pre-populate the store; does not count as a call
    pub fn with_entries<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        self.data.write().extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stored value, read without counting a call
    pub fn snapshot(&self, key: &Key) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn stats(&self) -> RemoteStats {
        RemoteStats { gets: self.gets.load(Ordering::Relaxed), puts: self.puts.load(Ordering::Relaxed) }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        trace!(namespace = %self.namespace, %key, "remote get");
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &Key, value: &Value) -> Result<()> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        trace!(namespace = %self.namespace, %key, "remote put");
        self.data.write().insert(key.clone(), value.clone());
        Ok(())
    }
}

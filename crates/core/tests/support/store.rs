//! In-memory `DocumentStore` with failure injection

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clout_core::DocumentStore;
use clout_domain::{CloutError, Result as DomainResult};

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    content_types: BTreeMap<String, String>,
    failing_puts: BTreeSet<String>,
    failing_put_prefixes: Vec<String>,
    failing_gets: BTreeSet<String>,
    put_attempts: Vec<String>,
}

/// Thread-safe map of key to bytes.
///
/// Keys registered with [`MemoryStore::fail_put`] or
/// [`MemoryStore::fail_get`] return a storage error without touching state.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.state.lock().unwrap().objects.insert(key.to_string(), body.into());
        self
    }

    pub fn fail_put(&self, key: &str) {
        self.state.lock().unwrap().failing_puts.insert(key.to_string());
    }

    pub fn fail_puts_with_prefix(&self, prefix: &str) {
        self.state.lock().unwrap().failing_put_prefixes.push(prefix.to_string());
    }

    pub fn fail_get(&self, key: &str) {
        self.state.lock().unwrap().failing_gets.insert(key.to_string());
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_puts.clear();
        state.failing_put_prefixes.clear();
        state.failing_gets.clear();
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().content_types.get(key).cloned()
    }

    /// Every stored object, for byte-for-byte comparisons.
    pub fn dump(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.lock().unwrap().objects.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys().into_iter().filter(|key| key.starts_with(prefix)).collect()
    }

    pub fn put_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().put_attempts.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> DomainResult<Option<Vec<u8>>> {
        let state = self.state.lock().unwrap();
        if state.failing_gets.contains(key) {
            return Err(CloutError::Storage(format!("injected read failure for {key}")));
        }
        Ok(state.objects.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        state.put_attempts.push(key.to_string());
        let prefixed = state.failing_put_prefixes.iter().any(|prefix| key.starts_with(prefix));
        if prefixed || state.failing_puts.contains(key) {
            return Err(CloutError::Storage(format!("injected write failure for {key}")));
        }
        state.objects.insert(key.to_string(), body);
        state.content_types.insert(key.to_string(), content_type.to_string());
        Ok(())
    }
}

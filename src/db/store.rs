//! The durable byte store the ride repository persists into.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};

/// Opaque key-value storage. Values are never interpreted by the store.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns `None` when the key has never been written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// In-process store used by tests and ephemeral sessions.
///
/// Clones share the same map, so a test can keep a handle after moving one
/// into a repository.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` fail until switched back off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `get` fail until switched back off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.lock().insert(key.to_string(), value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("read of '{key}' rejected"));
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("write to '{key}' rejected"));
        }
        self.insert_raw(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(handle.raw("k"), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn injected_write_failure() {
        let store = MemoryStore::new();
        store.insert_raw("k", "old");
        store.fail_writes(true);
        assert!(store.set("k", b"new".to_vec()).await.is_err());
        assert_eq!(store.raw("k"), Some(b"old".to_vec()));

        store.fail_writes(false);
        store.set("k", b"new".to_vec()).await.unwrap();
        assert_eq!(store.raw("k"), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let store = MemoryStore::new();
        store.insert_raw("k", "v");
        store.fail_reads(true);
        assert!(store.get("k").await.is_err());

        store.fail_reads(false);
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}

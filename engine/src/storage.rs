//! Durable key-value storage substrate.
//!
//! The engine performs no file or platform IO of its own: the queue and the
//! mirror both persist through a [`StorageBackend`] injected by the host.
//! Values are serialized JSON strings; the engine never interprets them at
//! this layer.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Durable key-value storage, partitioned into named logical stores.
///
/// Implementations must make `put` durable by the time it returns and must
/// serialize concurrent writes to the same store, so that two enqueues or
/// two puts to the same key cannot interleave into a lost update.
///
/// Any failure to open, read, or write the substrate surfaces as
/// [`Error::StorageUnavailable`].
pub trait StorageBackend: Send + Sync {
    /// Read a value by key.
    fn get(&self, store: &str, key: &str) -> Result<Option<String>>;

    /// Write a value (idempotent upsert).
    fn put(&self, store: &str, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, store: &str, key: &str) -> Result<()>;

    /// All entries of a store, ordered by key.
    fn scan(&self, store: &str) -> Result<Vec<(String, String)>>;

    /// Drop every entry of a store.
    fn clear(&self, store: &str) -> Result<()>;
}

/// In-memory [`StorageBackend`].
///
/// Durable only for the lifetime of the process; used in tests and as the
/// default when no data directory is configured. A single mutex serializes
/// all writers, which is enough given that at most one sync pass runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, String>>>> {
        self.stores
            .lock()
            .map_err(|_| Error::StorageUnavailable("storage lock poisoned".into()))
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
        let stores = self.locked()?;
        Ok(stores.get(store).and_then(|s| s.get(key).cloned()))
    }

    fn put(&self, store: &str, key: &str, value: &str) -> Result<()> {
        let mut stores = self.locked()?;
        stores
            .entry(store.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, store: &str, key: &str) -> Result<()> {
        let mut stores = self.locked()?;
        if let Some(s) = stores.get_mut(store) {
            s.remove(key);
        }
        Ok(())
    }

    fn scan(&self, store: &str) -> Result<Vec<(String, String)>> {
        let stores = self.locked()?;
        Ok(stores
            .get(store)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn clear(&self, store: &str) -> Result<()> {
        let mut stores = self.locked()?;
        stores.remove(store);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.get("s", "k").unwrap(), None);

        backend.put("s", "k", "v1").unwrap();
        assert_eq!(backend.get("s", "k").unwrap(), Some("v1".into()));

        // Upsert overwrites
        backend.put("s", "k", "v2").unwrap();
        assert_eq!(backend.get("s", "k").unwrap(), Some("v2".into()));

        backend.delete("s", "k").unwrap();
        assert_eq!(backend.get("s", "k").unwrap(), None);

        // Deleting an absent key is fine
        backend.delete("s", "k").unwrap();
    }

    #[test]
    fn stores_are_isolated() {
        let backend = MemoryBackend::new();
        backend.put("a", "k", "in-a").unwrap();
        backend.put("b", "k", "in-b").unwrap();

        assert_eq!(backend.get("a", "k").unwrap(), Some("in-a".into()));
        assert_eq!(backend.get("b", "k").unwrap(), Some("in-b".into()));

        backend.clear("a").unwrap();
        assert_eq!(backend.get("a", "k").unwrap(), None);
        assert_eq!(backend.get("b", "k").unwrap(), Some("in-b".into()));
    }

    #[test]
    fn scan_is_key_ordered() {
        let backend = MemoryBackend::new();
        backend.put("s", "b", "2").unwrap();
        backend.put("s", "a", "1").unwrap();
        backend.put("s", "c", "3").unwrap();

        let entries = backend.scan("s").unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn scan_missing_store_is_empty() {
        let backend = MemoryBackend::new();
        assert!(backend.scan("nope").unwrap().is_empty());
    }
}

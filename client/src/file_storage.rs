//! File-backed storage substrate.
//!
//! One JSON document per logical store under a data directory. Writes go
//! through a temp file followed by a rename, so a store file is always a
//! complete document and a `put` that has returned survives a crash.

use satchel_engine::{Error, StorageBackend};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Result<T> = std::result::Result<T, Error>;
type StoreMap = BTreeMap<String, String>;

/// Durable [`StorageBackend`] writing one JSON file per store.
///
/// Stores are loaded on first access and kept in memory; every mutation is
/// written through before it returns. A single mutex serializes writers,
/// which is enough given the single-active-pass model.
pub struct FileBackend {
    root: PathBuf,
    cache: Mutex<HashMap<String, StoreMap>>,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at the given directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_err)?;
        Ok(Self {
            root,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn store_path(&self, store: &str) -> PathBuf {
        // Store names come from the engine's registry; sanitize anyway so a
        // collection name can never escape the data directory.
        let safe: String = store
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    fn with_store<T>(&self, store: &str, f: impl FnOnce(&mut StoreMap) -> T) -> Result<T> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| Error::StorageUnavailable("storage lock poisoned".into()))?;

        if !cache.contains_key(store) {
            cache.insert(store.to_string(), self.load(store)?);
        }
        let map = cache
            .get_mut(store)
            .ok_or_else(|| Error::StorageUnavailable("store cache missing".into()))?;
        Ok(f(map))
    }

    fn load(&self, store: &str) -> Result<StoreMap> {
        let path = self.store_path(store);
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::StorageUnavailable(format!("corrupt store file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreMap::new()),
            Err(e) => Err(io_err(e)),
        }
    }

    fn persist(&self, store: &str, map: &StoreMap) -> Result<()> {
        let path = self.store_path(store);
        let raw = serde_json::to_string(map).map_err(|e| Error::StorageUnavailable(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::StorageUnavailable(e.to_string())
}

impl StorageBackend for FileBackend {
    fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
        self.with_store(store, |map| map.get(key).cloned())
    }

    fn put(&self, store: &str, key: &str, value: &str) -> Result<()> {
        // Persist under the cache lock so two writers cannot flush their
        // store files out of order.
        self.with_store(store, |map| {
            map.insert(key.to_string(), value.to_string());
            self.persist(store, map)
        })?
    }

    fn delete(&self, store: &str, key: &str) -> Result<()> {
        self.with_store(store, |map| {
            map.remove(key);
            self.persist(store, map)
        })?
    }

    fn scan(&self, store: &str) -> Result<Vec<(String, String)>> {
        self.with_store(store, |map| {
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        })
    }

    fn clear(&self, store: &str) -> Result<()> {
        self.with_store(store, |map| {
            map.clear();
            match fs::remove_file(self.store_path(store)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(e)),
            }
        })?
    }
}

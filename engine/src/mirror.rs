//! LocalStore - the durable mirror of remote documents.
//!
//! One logical store per collection, keyed by document id. The mirror is the
//! read path while offline and the staging area for offline writes; the sync
//! engine rewrites it when creates are confirmed and ids remapped.

use crate::error::{Error, Result};
use crate::record::LocalRecord;
use crate::storage::StorageBackend;
use std::sync::Arc;

/// Single registry for collection → store-name mapping.
///
/// Every component that needs a mirror store name goes through this; nothing
/// else spells the naming scheme.
pub fn mirror_store_name(collection: &str) -> String {
    format!("mirror.{collection}")
}

/// Durable per-collection mirror of remote documents.
///
/// `put` writes whole records and overwrites on id collision; merge
/// semantics belong to callers. Records with offline placeholder ids and
/// records with remote-assigned ids are held alike.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    /// Create a mirror over the given storage backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Get a record by collection and id.
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<LocalRecord>> {
        match self.backend.get(&mirror_store_name(collection), id)? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Get a record, or a [`Error::NotFound`] if it is absent.
    pub fn require(&self, collection: &str, id: &str) -> Result<LocalRecord> {
        self.get(collection, id)?.ok_or_else(|| Error::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// Idempotent whole-record upsert.
    pub fn put(&self, record: &LocalRecord) -> Result<()> {
        let raw = encode(record)?;
        self.backend
            .put(&mirror_store_name(&record.collection), &record.id, &raw)
    }

    /// All records of a collection, ordered by id.
    pub fn get_all(&self, collection: &str) -> Result<Vec<LocalRecord>> {
        self.backend
            .scan(&mirror_store_name(collection))?
            .iter()
            .map(|(_, raw)| decode(raw))
            .collect()
    }

    /// Delete a record. Deleting an absent record is not an error.
    pub fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.backend.delete(&mirror_store_name(collection), id)
    }

    /// Count of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.backend.scan(&mirror_store_name(collection))?.len())
    }
}

fn encode(record: &LocalRecord) -> Result<String> {
    serde_json::to_string(record).map_err(|e| Error::StorageUnavailable(e.to_string()))
}

fn decode(raw: &str) -> Result<LocalRecord> {
    serde_json::from_str(raw).map_err(|e| Error::StorageUnavailable(e.to_string()))
}

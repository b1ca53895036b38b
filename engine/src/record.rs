//! Local record types for the mirror store.

use crate::{CollectionName, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// Where the current state of a mirrored record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Fetched from, or confirmed by, the remote store
    Remote,
    /// Created locally while offline; the id is a placeholder
    OfflineCreated,
    /// Exists remotely but was modified locally while offline
    OfflineUpdated,
}

/// A document in the local mirror.
///
/// The mirror always holds whole records; merge semantics belong to callers.
/// A record created offline is keyed by its placeholder id until the create
/// is confirmed, at which point it is re-keyed under the remote-assigned id
/// within the same reconciliation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    /// Collection this record belongs to
    pub collection: CollectionName,
    /// Current document id (placeholder or remote-assigned)
    pub id: RecordId,
    /// The actual data payload (JSON value)
    pub payload: serde_json::Value,
    /// Provenance of the current state
    pub origin: Origin,
    /// When the record was last written locally (milliseconds since epoch)
    pub updated_at: Timestamp,
}

impl LocalRecord {
    /// Create a record mirroring remote state.
    pub fn new_remote(
        collection: impl Into<CollectionName>,
        id: impl Into<RecordId>,
        payload: serde_json::Value,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            payload,
            origin: Origin::Remote,
            updated_at,
        }
    }

    /// Create a record minted locally while offline.
    pub fn new_offline(
        collection: impl Into<CollectionName>,
        id: impl Into<RecordId>,
        payload: serde_json::Value,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            payload,
            origin: Origin::OfflineCreated,
            updated_at,
        }
    }

    /// Replace the payload after a local edit.
    ///
    /// A record that has never been created remotely stays `OfflineCreated`;
    /// everything else becomes `OfflineUpdated`.
    pub fn apply_local_update(&mut self, payload: serde_json::Value, updated_at: Timestamp) {
        self.payload = payload;
        self.updated_at = updated_at;
        if self.origin != Origin::OfflineCreated {
            self.origin = Origin::OfflineUpdated;
        }
    }

    /// Re-key this record under the remote-assigned id after a confirmed
    /// create, carrying every other field over.
    pub fn remapped(&self, remote_id: impl Into<RecordId>) -> Self {
        Self {
            collection: self.collection.clone(),
            id: remote_id.into(),
            payload: self.payload.clone(),
            origin: Origin::Remote,
            updated_at: self.updated_at,
        }
    }
}

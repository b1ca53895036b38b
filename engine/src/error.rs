//! Error types for the Satchel engine.

use crate::{CollectionName, RecordId, SequenceId};
use thiserror::Error;

/// All possible errors from the Satchel engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Storage errors: fatal to the calling operation, surfaced immediately,
    // never retried by the engine.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    // Remote errors: the operation stays queued and is retried next pass.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("remote rejected operation: {0}")]
    RemoteRejected(String),

    // Per-operation errors: recorded in the pass result, never abort a pass.
    #[error("record not found: {collection}/{id}")]
    NotFound {
        collection: CollectionName,
        id: RecordId,
    },

    #[error("operation {0} has no target id")]
    MissingTargetId(SequenceId),

    // Guard results of a sync request.
    #[error("cannot sync now: a pass is already in progress")]
    SyncInProgress,

    #[error("cannot sync now: offline")]
    Offline,
}

impl Error {
    /// Whether a durable-storage failure caused this error.
    ///
    /// Storage failures abort the pass; everything else is recorded against
    /// the individual operation.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

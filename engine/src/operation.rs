//! Pending operation types.
//!
//! Mutations are expressed as operations appended to a durable log, not as
//! direct remote calls. This is what lets the application keep writing while
//! offline: the log replays against the backend once connectivity returns.

use crate::{CollectionName, RecordId, SequenceId, Timestamp};
use serde::{Deserialize, Serialize};

/// The kind of mutation a pending operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A mutation not yet confirmed by the remote store.
///
/// The sequence id is assigned by [`PendingQueue::enqueue`] and is strictly
/// increasing in enqueue order; the queue is drained in that order on every
/// pass. An operation is removed only after a confirmed successful apply.
///
/// `target_id` holds the document id the operation addresses. For a
/// [`OperationKind::Create`] this is the offline placeholder id the payload
/// was mirrored under, which the engine needs for remapping once the backend
/// assigns the real id.
///
/// [`PendingQueue::enqueue`]: crate::PendingQueue::enqueue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    /// Queue position, assigned at enqueue time (0 until enqueued)
    pub sequence_id: SequenceId,
    /// Target collection
    pub collection: CollectionName,
    /// Kind of mutation
    pub kind: OperationKind,
    /// Full payload of the mutation
    pub payload: serde_json::Value,
    /// Document id the operation addresses
    pub target_id: Option<RecordId>,
    /// When the operation was enqueued (milliseconds since epoch)
    pub enqueued_at: Timestamp,
    /// Number of failed apply attempts so far
    pub attempts: u32,
    /// Error message from the most recent failed attempt
    pub last_error: Option<String>,
}

impl PendingOperation {
    /// Create a new operation, ready to be enqueued.
    pub fn new(
        kind: OperationKind,
        collection: impl Into<CollectionName>,
        payload: serde_json::Value,
        target_id: Option<RecordId>,
        enqueued_at: Timestamp,
    ) -> Self {
        Self {
            sequence_id: 0,
            collection: collection.into(),
            kind,
            payload,
            target_id,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }

    /// Record a failed apply attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.attempts += 1;
        self.last_error = Some(error.into());
    }
}

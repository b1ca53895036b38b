//! PendingQueue - the durable ordered log of unconfirmed mutations.
//!
//! Operations are keyed by a zero-padded decimal sequence id so the
//! backend's key-ordered scan returns them in enqueue order. Once `enqueue`
//! returns, the operation survives a process restart; reopening the queue
//! recovers the next sequence id from the surviving log.

use crate::error::{Error, Result};
use crate::operation::PendingOperation;
use crate::storage::StorageBackend;
use crate::SequenceId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The one logical store the queue persists into.
const QUEUE_STORE: &str = "pending_ops";

// Wide enough that lexicographic key order equals numeric order for any u64.
fn sequence_key(seq: SequenceId) -> String {
    format!("{seq:020}")
}

/// Durable ordered log of pending operations.
pub struct PendingQueue {
    backend: Arc<dyn StorageBackend>,
    next_sequence: AtomicU64,
}

impl PendingQueue {
    /// Open the queue over the given backend, recovering sequence state
    /// from any operations that survived a restart.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let entries = backend.scan(QUEUE_STORE)?;
        let max_seq = entries
            .last()
            .map(|(_, raw)| decode(raw).map(|op| op.sequence_id))
            .transpose()?
            .unwrap_or(0);

        Ok(Self {
            backend,
            next_sequence: AtomicU64::new(max_seq + 1),
        })
    }

    /// Append an operation and return its assigned sequence id.
    ///
    /// Durable once this returns.
    pub fn enqueue(&self, mut op: PendingOperation) -> Result<SequenceId> {
        let seq = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        op.sequence_id = seq;
        self.backend
            .put(QUEUE_STORE, &sequence_key(seq), &encode(&op)?)?;

        tracing::debug!(
            sequence_id = seq,
            collection = %op.collection,
            kind = %op.kind,
            "operation enqueued"
        );
        Ok(seq)
    }

    /// Load a single operation.
    pub fn get(&self, seq: SequenceId) -> Result<Option<PendingOperation>> {
        match self.backend.get(QUEUE_STORE, &sequence_key(seq))? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Remove an operation after a confirmed successful apply.
    pub fn remove(&self, seq: SequenceId) -> Result<()> {
        self.backend.delete(QUEUE_STORE, &sequence_key(seq))
    }

    /// Persist the outcome of a failed apply attempt.
    pub fn update_attempt(
        &self,
        seq: SequenceId,
        attempts: u32,
        last_error: Option<String>,
    ) -> Result<()> {
        let mut op = self.get(seq)?.ok_or_else(|| {
            Error::StorageUnavailable(format!("queued operation {seq} disappeared"))
        })?;
        op.attempts = attempts;
        op.last_error = last_error;
        self.backend
            .put(QUEUE_STORE, &sequence_key(seq), &encode(&op)?)
    }

    /// Rewrite the target id of a queued operation.
    ///
    /// Used when a create earlier in a pass remapped the offline id this
    /// operation was enqueued against; persisting the rewrite keeps it valid
    /// across a crash or a later failed attempt.
    pub fn retarget(&self, seq: SequenceId, new_target: impl Into<String>) -> Result<()> {
        let mut op = self.get(seq)?.ok_or_else(|| {
            Error::StorageUnavailable(format!("queued operation {seq} disappeared"))
        })?;
        op.target_id = Some(new_target.into());
        self.backend
            .put(QUEUE_STORE, &sequence_key(seq), &encode(&op)?)
    }

    /// All queued operations in ascending sequence order.
    pub fn list_all(&self) -> Result<Vec<PendingOperation>> {
        self.backend
            .scan(QUEUE_STORE)?
            .iter()
            .map(|(_, raw)| decode(raw))
            .collect()
    }

    /// Number of queued operations.
    pub fn count(&self) -> Result<usize> {
        Ok(self.backend.scan(QUEUE_STORE)?.len())
    }
}

fn encode(op: &PendingOperation) -> Result<String> {
    serde_json::to_string(op).map_err(|e| Error::StorageUnavailable(e.to_string()))
}

fn decode(raw: &str) -> Result<PendingOperation> {
    serde_json::from_str(raw).map_err(|e| Error::StorageUnavailable(e.to_string()))
}

//! SyncEngine - the reconciler.
//!
//! Drains a snapshot of the pending queue against the remote store, strictly
//! in enqueue order, remapping offline ids on confirmed creates and
//! recording per-operation failures instead of aborting. A started pass
//! always runs to completion over its fixed snapshot, even if connectivity
//! drops partway through.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::mirror::LocalStore;
use crate::operation::{OperationKind, PendingOperation};
use crate::queue::PendingQueue;
use crate::record::LocalRecord;
use crate::remote::RemoteStore;
use crate::{CollectionName, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Reconciler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No pass in flight
    Idle,
    /// A pass is draining the queue
    Syncing,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
        }
    }
}

/// Outcome of one reconciliation pass. Never partially mutated after return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Size of the queue snapshot the pass drained
    pub attempted: usize,
    /// Operations confirmed and removed
    pub succeeded: usize,
    /// Operations that stay queued for the next pass
    pub failed: usize,
    /// One message per failed operation
    pub errors: Vec<String>,
}

/// The reconciler.
///
/// Both manual and connectivity-triggered sync requests funnel through one
/// atomic flag, so at most one pass is ever in flight; within a pass, remote
/// operations apply strictly sequentially to preserve per-document ordering.
pub struct SyncEngine {
    mirror: LocalStore,
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<ConnectivityMonitor>,
    syncing: AtomicBool,
    state_tx: watch::Sender<SyncState>,
}

// Resets the mutual-exclusion flag and the state channel on every exit
// path, including early storage-error returns.
struct PassGuard<'a> {
    syncing: &'a AtomicBool,
    state_tx: &'a watch::Sender<SyncState>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.syncing.store(false, Ordering::SeqCst);
        self.state_tx.send_replace(SyncState::Idle);
    }
}

impl SyncEngine {
    /// Create a reconciler over the given components.
    pub fn new(
        mirror: LocalStore,
        queue: Arc<PendingQueue>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let (state_tx, _rx) = watch::channel(SyncState::Idle);
        Self {
            mirror,
            queue,
            remote,
            connectivity,
            syncing: AtomicBool::new(false),
            state_tx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn state_receiver(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// Run one reconciliation pass.
    ///
    /// Guarded by `is_online ∧ ¬already_syncing`: returns [`Error::Offline`]
    /// or [`Error::SyncInProgress`] without queuing or blocking when the
    /// guard fails. Operations enqueued after the snapshot is taken wait
    /// for the next pass.
    pub async fn sync(&self) -> Result<SyncResult> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::SyncInProgress);
        }
        let _guard = PassGuard {
            syncing: &self.syncing,
            state_tx: &self.state_tx,
        };
        self.state_tx.send_replace(SyncState::Syncing);

        let snapshot = self.queue.list_all()?;
        tracing::info!(attempted = snapshot.len(), "sync pass started");

        let mut result = SyncResult {
            attempted: snapshot.len(),
            ..SyncResult::default()
        };
        // Offline ids confirmed earlier in this pass, so that updates and
        // deletes enqueued against a not-yet-created document follow the
        // record to its remote-assigned id.
        let mut remaps: HashMap<(CollectionName, RecordId), RecordId> = HashMap::new();

        for mut op in snapshot {
            if let Some(target) = op.target_id.as_ref() {
                let key = (op.collection.clone(), target.clone());
                if let Some(remote_id) = remaps.get(&key) {
                    self.queue.retarget(op.sequence_id, remote_id.clone())?;
                    op.target_id = Some(remote_id.clone());
                }
            }

            match self.apply_operation(&op, &mut remaps).await {
                Ok(()) => {
                    self.queue.remove(op.sequence_id)?;
                    result.succeeded += 1;
                }
                Err(err) if err.is_storage() => return Err(err),
                Err(err) => {
                    let message = format!(
                        "op {} ({} {}): {}",
                        op.sequence_id, op.kind, op.collection, err
                    );
                    tracing::warn!(
                        sequence_id = op.sequence_id,
                        attempts = op.attempts + 1,
                        "operation failed: {err}"
                    );
                    self.queue
                        .update_attempt(op.sequence_id, op.attempts + 1, Some(message.clone()))?;
                    result.failed += 1;
                    result.errors.push(message);
                }
            }
        }

        tracing::info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "sync pass finished"
        );
        Ok(result)
    }

    async fn apply_operation(
        &self,
        op: &PendingOperation,
        remaps: &mut HashMap<(CollectionName, RecordId), RecordId>,
    ) -> Result<()> {
        match op.kind {
            OperationKind::Create => {
                let offline_id = op
                    .target_id
                    .clone()
                    .ok_or(Error::MissingTargetId(op.sequence_id))?;
                let remote_id = self.remote.create(&op.collection, &op.payload).await?;

                // Re-key within this reconciliation step: insert the record
                // under the remote id, then drop the placeholder so it never
                // reappears as a live key.
                let record = match self.mirror.get(&op.collection, &offline_id)? {
                    Some(existing) => existing.remapped(&remote_id),
                    // Mirror entry vanished; rebuild from the payload. The
                    // remote create already happened, so failing here would
                    // duplicate it on the next pass.
                    None => LocalRecord::new_remote(
                        &op.collection,
                        &remote_id,
                        op.payload.clone(),
                        op.enqueued_at,
                    ),
                };
                self.mirror.put(&record)?;
                // Offline ids are caller-chosen; if the backend happens to
                // assign the same id, dropping it would destroy the record
                // just written.
                if remote_id != offline_id {
                    self.mirror.delete(&op.collection, &offline_id)?;
                }

                tracing::debug!(
                    collection = %op.collection,
                    %offline_id,
                    %remote_id,
                    "id remapped"
                );
                remaps.insert((op.collection.clone(), offline_id), remote_id);
                Ok(())
            }
            OperationKind::Update => {
                let id = op
                    .target_id
                    .clone()
                    .ok_or(Error::MissingTargetId(op.sequence_id))?;
                // The mirror holds the current payload, written by the
                // caller at enqueue time; a vanished id is a per-operation
                // error, not an abort.
                self.mirror.require(&op.collection, &id)?;
                self.remote.update(&op.collection, &id, &op.payload).await
            }
            OperationKind::Delete => {
                let id = op
                    .target_id
                    .clone()
                    .ok_or(Error::MissingTargetId(op.sequence_id))?;
                // The mirror entry was removed at enqueue time, but a
                // remapped create earlier in this pass re-inserts the record
                // under the remote id; drop it again so a deleted document
                // stays gone.
                self.remote.soft_delete(&op.collection, &id).await?;
                self.mirror.delete(&op.collection, &id)
            }
        }
    }
}

//! The client facade.
//!
//! Wires mirror, queue, connectivity, and sync engine together behind the
//! interface a view layer consumes. Every mutation writes the mirror first
//! and then enqueues, so no queued operation can reference a record that was
//! never written.

use crate::config::ClientConfig;
use crate::file_storage::FileBackend;
use satchel_engine::{
    ConnectivityMonitor, Error, LocalRecord, LocalStore, MemoryBackend, OperationKind,
    PendingOperation, PendingQueue, RecordId, RemoteStore, StorageBackend, SyncEngine, SyncResult,
    SyncState,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use uuid::Uuid;

type Result<T> = std::result::Result<T, Error>;

/// Offline-first client handle.
///
/// Cheap to share as an `Arc`; all methods take `&self`. Must be created
/// inside a tokio runtime: construction spawns the background task that
/// runs a sync pass on every offline→online transition.
pub struct Client {
    mirror: LocalStore,
    queue: Arc<PendingQueue>,
    connectivity: Arc<ConnectivityMonitor>,
    remote: Arc<dyn RemoteStore>,
    engine: Arc<SyncEngine>,
    pending_tx: watch::Sender<usize>,
}

impl Client {
    /// Create a client from configuration.
    pub fn new(config: ClientConfig, remote: Arc<dyn RemoteStore>) -> Result<Arc<Self>> {
        let backend: Arc<dyn StorageBackend> = match &config.data_dir {
            Some(dir) => Arc::new(FileBackend::open(dir)?),
            None => Arc::new(MemoryBackend::new()),
        };
        Self::with_backend(backend, remote, config.assume_online)
    }

    /// Create a client over an explicit storage backend.
    pub fn with_backend(
        backend: Arc<dyn StorageBackend>,
        remote: Arc<dyn RemoteStore>,
        assume_online: bool,
    ) -> Result<Arc<Self>> {
        let mirror = LocalStore::new(backend.clone());
        let queue = Arc::new(PendingQueue::open(backend)?);
        let connectivity = Arc::new(ConnectivityMonitor::new(assume_online));
        let engine = Arc::new(SyncEngine::new(
            mirror.clone(),
            queue.clone(),
            remote.clone(),
            connectivity.clone(),
        ));
        let (pending_tx, _rx) = watch::channel(queue.count()?);

        let client = Arc::new(Self {
            mirror,
            queue,
            connectivity,
            remote,
            engine,
            pending_tx,
        });
        client.spawn_auto_sync();
        Ok(client)
    }

    // Runs a pass on each offline→online transition. Holds only a weak
    // handle so dropping the last client handle ends the task.
    fn spawn_auto_sync(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if !online {
                    continue;
                }
                let Some(client) = weak.upgrade() else { break };
                match client.engine.sync().await {
                    Ok(result) => tracing::info!(
                        succeeded = result.succeeded,
                        failed = result.failed,
                        "automatic sync pass finished"
                    ),
                    // Offline again or a manual pass already running;
                    // nothing to do until the next transition.
                    Err(err) => tracing::debug!("automatic sync skipped: {err}"),
                }
                client.refresh_pending();
            }
        });
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Create a document locally and queue its remote create.
    ///
    /// Returns the offline placeholder id the document is readable under
    /// until a sync pass confirms the create and remaps it.
    pub fn enqueue_create(
        &self,
        collection: &str,
        payload: serde_json::Value,
    ) -> Result<RecordId> {
        let offline_id = mint_offline_id();
        let now = now_millis();

        self.mirror
            .put(&LocalRecord::new_offline(collection, &offline_id, payload.clone(), now))?;
        self.queue.enqueue(PendingOperation::new(
            OperationKind::Create,
            collection,
            payload,
            Some(offline_id.clone()),
            now,
        ))?;

        self.refresh_pending();
        Ok(offline_id)
    }

    /// Replace a document's payload locally and queue the remote update.
    pub fn enqueue_update(
        &self,
        collection: &str,
        id: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let now = now_millis();
        let mut record = self.mirror.require(collection, id)?;
        record.apply_local_update(payload.clone(), now);
        self.mirror.put(&record)?;

        self.queue.enqueue(PendingOperation::new(
            OperationKind::Update,
            collection,
            payload,
            Some(id.to_string()),
            now,
        ))?;

        self.refresh_pending();
        Ok(())
    }

    /// Remove a document locally and queue the remote soft-delete.
    pub fn enqueue_delete(&self, collection: &str, id: &str) -> Result<()> {
        self.mirror.require(collection, id)?;
        self.mirror.delete(collection, id)?;

        self.queue.enqueue(PendingOperation::new(
            OperationKind::Delete,
            collection,
            serde_json::Value::Null,
            Some(id.to_string()),
            now_millis(),
        ))?;

        self.refresh_pending();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    /// Read a document, mirror-first.
    ///
    /// On a mirror miss while online, fetches from the remote store and
    /// caches the result; while offline a miss is simply `None`.
    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Option<LocalRecord>> {
        if let Some(record) = self.mirror.get(collection, id)? {
            return Ok(Some(record));
        }
        if !self.connectivity.is_online() {
            return Ok(None);
        }
        match self.remote.fetch(collection, id).await? {
            Some(payload) => {
                let record = LocalRecord::new_remote(collection, id, payload, now_millis());
                self.mirror.put(&record)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// All mirrored documents of a collection, ordered by id.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<LocalRecord>> {
        self.mirror.get_all(collection)
    }

    /// Mirrored documents matching a payload predicate.
    pub fn list_documents_where<F>(&self, collection: &str, predicate: F) -> Result<Vec<LocalRecord>>
    where
        F: Fn(&serde_json::Value) -> bool,
    {
        Ok(self
            .mirror
            .get_all(collection)?
            .into_iter()
            .filter(|r| predicate(&r.payload))
            .collect())
    }

    // ------------------------------------------------------------------
    // Sync and signals
    // ------------------------------------------------------------------

    /// Run one reconciliation pass now.
    ///
    /// Returns [`Error::Offline`] or [`Error::SyncInProgress`] when the
    /// pass cannot start.
    pub async fn trigger_sync(&self) -> Result<SyncResult> {
        let result = self.engine.sync().await;
        self.refresh_pending();
        result
    }

    /// Number of mutations not yet confirmed by the remote store.
    pub fn pending_count(&self) -> Result<usize> {
        self.queue.count()
    }

    /// Record a connectivity change. An offline→online transition triggers
    /// an automatic sync pass.
    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Current reconciler state.
    pub fn sync_state(&self) -> SyncState {
        self.engine.state()
    }

    /// Watch connectivity transitions.
    pub fn subscribe_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }

    /// Watch pending-count changes.
    pub fn subscribe_pending_count(&self) -> watch::Receiver<usize> {
        self.pending_tx.subscribe()
    }

    /// Watch reconciler state transitions.
    pub fn subscribe_sync_state(&self) -> watch::Receiver<SyncState> {
        self.engine.state_receiver()
    }

    fn refresh_pending(&self) {
        if let Ok(count) = self.queue.count() {
            self.pending_tx.send_replace(count);
        }
    }
}

fn mint_offline_id() -> RecordId {
    format!("offline-{}", Uuid::new_v4())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

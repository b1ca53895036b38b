//! End-to-end reconciliation tests for satchel-engine.
//!
//! These drive full passes through the public API: mirror write, enqueue,
//! drain against a scripted remote store, and verify the mirror and queue
//! afterwards.

use async_trait::async_trait;
use proptest::prelude::*;
use satchel_engine::{
    ConnectivityMonitor, Error, LocalRecord, LocalStore, MemoryBackend, OperationKind, Origin,
    PendingOperation, PendingQueue, RecordId, RemoteStore, SyncEngine,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted backend: assigns R1, R2, ... ids and keeps the documents it has
/// accepted, so tests can assert on remote state.
#[derive(Default)]
struct ScriptedRemote {
    next_id: AtomicU64,
    documents: Mutex<HashMap<(String, String), serde_json::Value>>,
    deleted: Mutex<Vec<(String, String)>>,
    /// Payloads containing this marker fail with NetworkUnavailable
    fail_marker: Option<String>,
    /// When true, every call fails
    offline: Mutex<bool>,
}

impl ScriptedRemote {
    fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    fn set_unreachable(&self, unreachable: bool) {
        *self.offline.lock().unwrap() = unreachable;
    }

    fn document(&self, collection: &str, id: &str) -> Option<serde_json::Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    fn check(&self, payload: &serde_json::Value) -> Result<(), Error> {
        if *self.offline.lock().unwrap() {
            return Err(Error::NetworkUnavailable("no route to host".into()));
        }
        if let Some(marker) = &self.fail_marker {
            if payload.to_string().contains(marker.as_str()) {
                return Err(Error::NetworkUnavailable("connection reset".into()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn create(
        &self,
        collection: &str,
        payload: &serde_json::Value,
    ) -> Result<RecordId, Error> {
        self.check(payload)?;
        let id = format!("R{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.clone()), payload.clone());
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        payload: &serde_json::Value,
    ) -> Result<(), Error> {
        self.check(payload)?;
        self.documents
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), payload.clone());
        Ok(())
    }

    async fn soft_delete(&self, collection: &str, id: &str) -> Result<(), Error> {
        self.check(&serde_json::Value::Null)?;
        self.deleted
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string()));
        Ok(())
    }

    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, Error> {
        self.check(&serde_json::Value::Null)?;
        Ok(self.document(collection, id))
    }
}

struct World {
    backend: Arc<MemoryBackend>,
    mirror: LocalStore,
    queue: Arc<PendingQueue>,
    remote: Arc<ScriptedRemote>,
    engine: SyncEngine,
}

fn world(remote: ScriptedRemote) -> World {
    let backend = Arc::new(MemoryBackend::new());
    let mirror = LocalStore::new(backend.clone());
    let queue = Arc::new(PendingQueue::open(backend.clone()).unwrap());
    let remote = Arc::new(remote);
    let engine = SyncEngine::new(
        mirror.clone(),
        queue.clone(),
        remote.clone(),
        Arc::new(ConnectivityMonitor::new(true)),
    );
    World {
        backend,
        mirror,
        queue,
        remote,
        engine,
    }
}

/// Offline write path: mirror first, then enqueue.
fn offline_create(w: &World, collection: &str, offline_id: &str, payload: serde_json::Value) {
    w.mirror
        .put(&LocalRecord::new_offline(
            collection,
            offline_id,
            payload.clone(),
            1000,
        ))
        .unwrap();
    w.queue
        .enqueue(PendingOperation::new(
            OperationKind::Create,
            collection,
            payload,
            Some(offline_id.into()),
            1000,
        ))
        .unwrap();
}

// ============================================================================
// Spec scenarios
// ============================================================================

#[tokio::test]
async fn concrete_scenario_acme() {
    let w = world(ScriptedRemote::default());
    offline_create(&w, "clients", "offline-acme", json!({"name": "Acme"}));

    let result = w.engine.sync().await.unwrap();
    assert_eq!(result.attempted, 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(w.queue.count().unwrap(), 0);

    let record = w.mirror.get("clients", "R1").unwrap().unwrap();
    assert_eq!(record.payload, json!({"name": "Acme"}));
    assert_eq!(record.origin, Origin::Remote);
    assert!(w.mirror.get("clients", "offline-acme").unwrap().is_none());
}

#[tokio::test]
async fn drain_correctness_mixed_kinds() {
    let w = world(ScriptedRemote::default());

    // Two remote-known documents to update and delete, one offline create
    for id in ["c-1", "c-2"] {
        w.mirror
            .put(&LocalRecord::new_remote(
                "clients",
                id,
                json!({"name": id}),
                500,
            ))
            .unwrap();
    }
    offline_create(&w, "clients", "offline-1", json!({"name": "Bolt"}));

    w.mirror
        .put(&LocalRecord::new_remote(
            "clients",
            "c-1",
            json!({"name": "One, renamed"}),
            1500,
        ))
        .unwrap();
    w.queue
        .enqueue(PendingOperation::new(
            OperationKind::Update,
            "clients",
            json!({"name": "One, renamed"}),
            Some("c-1".into()),
            1500,
        ))
        .unwrap();

    w.mirror.delete("clients", "c-2").unwrap();
    w.queue
        .enqueue(PendingOperation::new(
            OperationKind::Delete,
            "clients",
            serde_json::Value::Null,
            Some("c-2".into()),
            1600,
        ))
        .unwrap();

    let result = w.engine.sync().await.unwrap();
    assert_eq!(result.attempted, 3);
    assert_eq!(result.succeeded, 3);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());
    assert_eq!(w.queue.count().unwrap(), 0);

    // Remote reflects every mutation
    assert_eq!(
        w.remote.document("clients", "R1"),
        Some(json!({"name": "Bolt"}))
    );
    assert_eq!(
        w.remote.document("clients", "c-1"),
        Some(json!({"name": "One, renamed"}))
    );
    assert_eq!(
        *w.remote.deleted.lock().unwrap(),
        vec![("clients".to_string(), "c-2".to_string())]
    );
}

#[tokio::test]
async fn failed_operations_survive_for_next_pass() {
    let w = world(ScriptedRemote::failing_on("flaky"));

    offline_create(&w, "clients", "offline-1", json!({"name": "steady"}));
    offline_create(&w, "clients", "offline-2", json!({"name": "flaky"}));

    let first = w.engine.sync().await.unwrap();
    assert_eq!(first.succeeded, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(w.queue.count().unwrap(), 1);

    let remaining = &w.queue.list_all().unwrap()[0];
    assert_eq!(remaining.attempts, 1);
    assert!(remaining.last_error.is_some());

    // Second flap: still failing, attempts accumulate
    let second = w.engine.sync().await.unwrap();
    assert_eq!(second.failed, 1);
    assert_eq!(w.queue.list_all().unwrap()[0].attempts, 2);
}

#[tokio::test]
async fn connectivity_drop_mid_pass_runs_to_completion() {
    let w = world(ScriptedRemote::default());

    offline_create(&w, "clients", "offline-1", json!({"name": "first"}));
    offline_create(&w, "clients", "offline-2", json!({"name": "second"}));

    // The backend becomes unreachable before the pass starts; the pass
    // still visits every snapshot operation and records failures rather
    // than aborting.
    w.remote.set_unreachable(true);
    let result = w.engine.sync().await.unwrap();
    assert_eq!(result.attempted, 2);
    assert_eq!(result.failed, 2);
    assert_eq!(result.errors.len(), 2);
    assert_eq!(w.queue.count().unwrap(), 2);

    // Connectivity returns: the next pass drains cleanly
    w.remote.set_unreachable(false);
    let retry = w.engine.sync().await.unwrap();
    assert_eq!(retry.succeeded, 2);
    assert_eq!(w.queue.count().unwrap(), 0);
}

#[tokio::test]
async fn restart_preserves_queue_and_mirror() {
    let w = world(ScriptedRemote::default());
    offline_create(&w, "clients", "offline-1", json!({"name": "Acme"}));

    // "Restart": rebuild every component over the surviving backend
    let mirror = LocalStore::new(w.backend.clone());
    let queue = Arc::new(PendingQueue::open(w.backend.clone()).unwrap());
    assert_eq!(queue.count().unwrap(), 1);
    assert!(mirror.get("clients", "offline-1").unwrap().is_some());

    let engine = SyncEngine::new(
        mirror.clone(),
        queue.clone(),
        w.remote.clone(),
        Arc::new(ConnectivityMonitor::new(true)),
    );
    let result = engine.sync().await.unwrap();
    assert_eq!(result.succeeded, 1);
    assert!(mirror.get("clients", "R1").unwrap().is_some());
}

#[tokio::test]
async fn offline_edit_chain_lands_under_remote_id() {
    let w = world(ScriptedRemote::default());

    // Create, edit, and delete-then-recreate style chains all minted while
    // offline against placeholder ids.
    offline_create(&w, "clients", "offline-1", json!({"name": "v1"}));
    w.queue
        .enqueue(PendingOperation::new(
            OperationKind::Update,
            "clients",
            json!({"name": "v2"}),
            Some("offline-1".into()),
            2000,
        ))
        .unwrap();
    w.mirror
        .put(&LocalRecord::new_offline(
            "clients",
            "offline-1",
            json!({"name": "v2"}),
            2000,
        ))
        .unwrap();

    let result = w.engine.sync().await.unwrap();
    assert_eq!(result.succeeded, 2);

    assert_eq!(
        w.remote.document("clients", "R1"),
        Some(json!({"name": "v2"}))
    );
    assert!(w.mirror.get("clients", "offline-1").unwrap().is_none());
}

// ============================================================================
// Drain property
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// For any N successful creates, one pass empties the queue and the
    /// mirror holds exactly N records, none under an offline id.
    #[test]
    fn drain_empties_queue_when_all_calls_succeed(n in 0usize..64) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            let w = world(ScriptedRemote::default());
            for i in 0..n {
                offline_create(
                    &w,
                    "clients",
                    &format!("offline-{i}"),
                    json!({"n": i}),
                );
            }

            let result = w.engine.sync().await.unwrap();
            prop_assert_eq!(result.attempted, n);
            prop_assert_eq!(result.succeeded, n);
            prop_assert_eq!(w.queue.count().unwrap(), 0);
            prop_assert_eq!(w.mirror.count("clients").unwrap(), n);

            for record in w.mirror.get_all("clients").unwrap() {
                prop_assert!(!record.id.starts_with("offline-"));
                prop_assert_eq!(record.origin, Origin::Remote);
            }
            Ok(())
        })?;
    }
}

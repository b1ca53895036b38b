//! # Satchel Engine
//!
//! An offline-first synchronization engine for client applications.
//!
//! This crate provides the core logic for working against an authoritative
//! backend while disconnected from it: a durable local mirror of remote
//! documents, a durable ordered queue of pending mutations, and a
//! reconciliation algorithm that drains the queue once connectivity returns.
//!
//! ## Design Principles
//!
//! - **No ambient IO**: durable storage is reached through an injected
//!   [`StorageBackend`], the backend through an injected [`RemoteStore`]
//! - **Ordered**: mutations replay strictly in enqueue order
//! - **Partial-failure tolerant**: one bad operation never blocks the rest
//!   of a pass
//! - **Restart safe**: once an enqueue returns, the operation survives a
//!   process restart
//!
//! ## Core Concepts
//!
//! ### Local records
//!
//! The [`LocalStore`] mirrors remote documents per collection, keyed by
//! document id. Records created offline carry a locally minted placeholder
//! id and an [`Origin`] flag; once the corresponding create is confirmed by
//! the backend, the record is re-keyed under the remote-assigned id and the
//! placeholder never reappears as a live key.
//!
//! ### Pending operations
//!
//! Mutations are expressed as [`PendingOperation`]s and appended to the
//! [`PendingQueue`], a durable log ordered by a strictly increasing sequence
//! id. An operation leaves the queue only after the remote store confirms it.
//!
//! ### Reconciliation
//!
//! The [`SyncEngine`] drains a snapshot of the queue against the
//! [`RemoteStore`], applying operations sequentially, remapping offline ids
//! on successful creates, and recording per-operation failures in a
//! [`SyncResult`] instead of aborting the pass. At most one pass is ever in
//! flight; a request while a pass runs reports [`Error::SyncInProgress`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use satchel_engine::{
//!     LocalRecord, LocalStore, MemoryBackend, OperationKind,
//!     PendingOperation, PendingQueue,
//! };
//! use serde_json::json;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let mirror = LocalStore::new(backend.clone());
//! let queue = PendingQueue::open(backend).unwrap();
//!
//! // Mirror first, then enqueue: no queued operation may reference a
//! // record that was never written.
//! let record = LocalRecord::new_offline("clients", "offline-1", json!({"name": "Acme"}), 1000);
//! mirror.put(&record).unwrap();
//!
//! let op = PendingOperation::new(
//!     OperationKind::Create,
//!     "clients",
//!     json!({"name": "Acme"}),
//!     Some("offline-1".into()),
//!     1000,
//! );
//! let seq = queue.enqueue(op).unwrap();
//! assert_eq!(seq, 1);
//! assert_eq!(queue.count().unwrap(), 1);
//! ```

pub mod connectivity;
pub mod error;
pub mod mirror;
pub mod operation;
pub mod queue;
pub mod record;
pub mod remote;
pub mod storage;
pub mod sync;

// Re-export main types at crate root
pub use connectivity::ConnectivityMonitor;
pub use error::Error;
pub use mirror::LocalStore;
pub use operation::{OperationKind, PendingOperation};
pub use queue::PendingQueue;
pub use record::{LocalRecord, Origin};
pub use remote::RemoteStore;
pub use storage::{MemoryBackend, StorageBackend};
pub use sync::{SyncEngine, SyncResult, SyncState};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type SequenceId = u64;
pub type Timestamp = u64;

//! # Satchel Client
//!
//! The embeddable facade over [`satchel_engine`] for host applications.
//!
//! A [`Client`] wires the durable mirror, the pending-operation queue, the
//! connectivity monitor, and the sync engine together behind the interface a
//! view layer consumes: enqueue mutations, read documents mirror-first, ask
//! for a sync pass, and subscribe to connectivity and pending-count changes.
//!
//! The crate also provides [`FileBackend`], a file-backed implementation of
//! the engine's storage substrate (one JSON document per logical store,
//! written atomically), and mints the offline placeholder ids used until the
//! backend assigns real ones.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use satchel_client::{Client, ClientConfig};
//! # use satchel_engine::{RemoteStore, RecordId};
//! # use async_trait::async_trait;
//! # struct HttpRemote;
//! # #[async_trait]
//! # impl RemoteStore for HttpRemote {
//! #     async fn create(&self, _: &str, _: &serde_json::Value) -> Result<RecordId, satchel_engine::Error> { unimplemented!() }
//! #     async fn update(&self, _: &str, _: &str, _: &serde_json::Value) -> Result<(), satchel_engine::Error> { unimplemented!() }
//! #     async fn soft_delete(&self, _: &str, _: &str) -> Result<(), satchel_engine::Error> { unimplemented!() }
//! #     async fn fetch(&self, _: &str, _: &str) -> Result<Option<serde_json::Value>, satchel_engine::Error> { unimplemented!() }
//! # }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), satchel_engine::Error> {
//! let config = ClientConfig::default().with_data_dir("/var/lib/myapp");
//! let client = Client::new(config, Arc::new(HttpRemote))?;
//!
//! let _id = client.enqueue_create("clients", serde_json::json!({"name": "Acme"}))?;
//! client.set_online(true); // triggers an automatic sync pass
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod file_storage;

pub use client::Client;
pub use config::ClientConfig;
pub use file_storage::FileBackend;

// The engine types a host needs alongside the facade.
pub use satchel_engine::{
    Error, LocalRecord, Origin, PendingOperation, RemoteStore, SyncResult, SyncState,
};

//! RemoteStore - the capability interface to the authoritative backend.
//!
//! The engine is transport-agnostic: hosts implement this trait over
//! whatever reaches their backend. Implementations perform no retries of
//! their own; retry policy is entirely the engine's pass-based model, where
//! a failed operation simply waits for the next pass.

use crate::error::Result;
use crate::RecordId;
use async_trait::async_trait;

/// Host-implemented adapter for the authoritative backend.
///
/// Each call either succeeds or fails with a classified [`Error`]:
/// [`Error::NetworkUnavailable`] when the call cannot complete,
/// [`Error::RemoteRejected`] when the backend refuses the payload, and
/// [`Error::NotFound`] when the target document does not exist remotely.
/// Timeout semantics belong to the implementation.
///
/// [`Error`]: crate::Error
/// [`Error::NetworkUnavailable`]: crate::Error::NetworkUnavailable
/// [`Error::RemoteRejected`]: crate::Error::RemoteRejected
/// [`Error::NotFound`]: crate::Error::NotFound
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a document and return its server-assigned id.
    async fn create(&self, collection: &str, payload: &serde_json::Value) -> Result<RecordId>;

    /// Replace a document's payload.
    async fn update(&self, collection: &str, id: &str, payload: &serde_json::Value) -> Result<()>;

    /// Flag a document deleted without physically removing it, preserving
    /// the audit trail.
    async fn soft_delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Fetch a document's payload, or `None` if it does not exist.
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>>;
}

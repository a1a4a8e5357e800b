//! Port interfaces for durable storage
//!
//! These traits define the boundary between the reconciler and the object
//! store implementation.

use async_trait::async_trait;
use clout_domain::Result;

/// Key-value object storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read an object; `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write an object, replacing any previous value.
    ///
    /// Implementations must be all-or-nothing: a failed put leaves the
    /// previous object untouched.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

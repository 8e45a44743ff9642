//! Storage backends for uploaded note files.

pub mod filesystem;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Storage backend trait.
///
/// Keys are SHA-256 content fingerprints, so storage is content-addressed
/// and identical files share one object.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content under its fingerprint
    async fn put(&self, fingerprint: &str, content: Bytes) -> Result<()>;

    /// Retrieve content by fingerprint
    async fn get(&self, fingerprint: &str) -> Result<Bytes>;

    /// Remove an object once no non-rejected note references it
    async fn delete(&self, fingerprint: &str) -> Result<()>;
}

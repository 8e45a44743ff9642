//! Filesystem storage backend.
//!
//! Objects land under the first two hex characters of their fingerprint so
//! a large corpus does not pile up in a single directory.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::StorageBackend;
use crate::error::{AppError, Result};

/// Filesystem-based storage backend
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    /// Create new filesystem storage rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a fingerprint to its sharded on-disk path.
    ///
    /// Keys come from the note service as SHA-256 hex; anything else
    /// (path separators, traversal) must never reach the filesystem.
    fn object_path(&self, fingerprint: &str) -> Result<PathBuf> {
        if fingerprint.len() != 64 || !fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AppError::Storage(format!(
                "Invalid storage key: {:?}",
                fingerprint
            )));
        }
        Ok(self.root.join(&fingerprint[..2]).join(fingerprint))
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, fingerprint: &str, content: Bytes) -> Result<()> {
        let path = self.object_path(fingerprint)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;

        Ok(())
    }

    async fn get(&self, fingerprint: &str) -> Result<Bytes> {
        let path = self.object_path(fingerprint)?;
        let content = fs::read(&path).await.map_err(|e| {
            AppError::Storage(format!("Failed to read object {}: {}", fingerprint, e))
        })?;
        Ok(Bytes::from(content))
    }

    async fn delete(&self, fingerprint: &str) -> Result<()> {
        let path = self.object_path(fingerprint)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Already reclaimed
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to delete object {}: {}",
                fingerprint, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "hello world"
    const FINGERPRINT: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn temp_store(name: &str) -> FilesystemStorage {
        let dir = std::env::temp_dir().join(format!(
            "notevault-storage-{}-{}",
            name,
            std::process::id()
        ));
        FilesystemStorage::new(dir)
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = temp_store("roundtrip");

        store
            .put(FINGERPRINT, Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        assert_eq!(
            store.get(FINGERPRINT).await.unwrap(),
            Bytes::from_static(b"hello world")
        );

        store.delete(FINGERPRINT).await.unwrap();
        assert!(store.get(FINGERPRINT).await.is_err());
    }

    #[tokio::test]
    async fn objects_shard_by_fingerprint_prefix() {
        let store = temp_store("shard");

        store
            .put(FINGERPRINT, Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(store.root.join("b9").join(FINGERPRINT).exists());
    }

    #[tokio::test]
    async fn rejects_non_fingerprint_keys() {
        let store = temp_store("badkey");

        assert!(store
            .put("../../etc/passwd", Bytes::from_static(b"x"))
            .await
            .is_err());
        assert!(store.get("deadbeef").await.is_err());
        assert!(store.delete("").await.is_err());
    }

    #[tokio::test]
    async fn delete_of_missing_object_is_ok() {
        let store = temp_store("missing");
        // SHA-256 of the empty string; never stored here
        let absent = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(store.delete(absent).await.is_ok());
    }
}

//! Note service.
//!
//! Handles note upload, content fingerprinting, duplicate detection,
//! moderation, and download bookkeeping.

use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::download::Download;
use crate::models::note::{Note, NoteStatus};
use crate::storage::StorageBackend;

const NOTE_COLUMNS: &str = "id, subject_id, user_id, title, description, file_key, file_sha256, \
     size_bytes, content_type, premium, requires_login, status, download_count, \
     created_at, updated_at";

/// Result of the duplicate-content check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub existing_note_id: Option<Uuid>,
}

/// Note service
pub struct NoteService {
    db: PgPool,
    storage: Arc<dyn StorageBackend>,
}

impl NoteService {
    /// Create a new note service
    pub fn new(db: PgPool, storage: Arc<dyn StorageBackend>) -> Self {
        Self { db, storage }
    }

    /// Calculate the SHA-256 content fingerprint of a file
    pub fn calculate_sha256(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Check whether a file with this fingerprint already exists.
    ///
    /// Looks for the earliest non-rejected note with the same fingerprint.
    /// There is no locking: two concurrent uploads with identical content
    /// can both pass this check before either row is committed.
    pub async fn check_duplicate(&self, fingerprint: &str) -> Result<DuplicateCheck> {
        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM notes WHERE file_sha256 = $1 AND status <> 'rejected' \
             ORDER BY created_at LIMIT 1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.db)
        .await?;

        Ok(DuplicateCheck {
            is_duplicate: existing.is_some(),
            existing_note_id: existing,
        })
    }

    /// Store an uploaded file and create its note row with pending status.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload(
        &self,
        subject_id: Uuid,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        content_type: &str,
        premium: bool,
        requires_login: bool,
        data: Bytes,
    ) -> Result<Note> {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if data.is_empty() {
            return Err(AppError::Validation("File body is empty".to_string()));
        }

        let subject_exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
                .bind(subject_id)
                .fetch_optional(&self.db)
                .await?;
        if subject_exists != Some(true) {
            return Err(AppError::NotFound("Subject not found".to_string()));
        }

        let fingerprint = Self::calculate_sha256(&data);

        let dup = self.check_duplicate(&fingerprint).await?;
        if let Some(existing_id) = dup.existing_note_id {
            return Err(AppError::Conflict(format!(
                "Identical file already uploaded as note {}",
                existing_id
            )));
        }

        let size_bytes = data.len() as i64;

        // Content-addressed: the fingerprint is the storage key, so the
        // same bytes are never stored twice.
        self.storage.put(&fingerprint, data).await?;

        let note = sqlx::query_as::<_, Note>(&format!(
            "INSERT INTO notes (subject_id, user_id, title, description, file_key, file_sha256, \
                 size_bytes, content_type, premium, requires_login) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(subject_id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(&fingerprint)
        .bind(&fingerprint)
        .bind(size_bytes)
        .bind(content_type)
        .bind(premium)
        .bind(requires_login)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(note_id = %note.id, user_id = %user_id, size_bytes, "Note uploaded");

        Ok(note)
    }

    /// Fetch a note by id
    pub async fn get_note(&self, note_id: Uuid) -> Result<Note> {
        sqlx::query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
            .bind(note_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
    }

    /// List approved notes for a subject
    pub async fn list_approved(&self, subject_id: Uuid) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE subject_id = $1 AND status = 'approved' \
             ORDER BY created_at DESC"
        ))
        .bind(subject_id)
        .fetch_all(&self.db)
        .await?;

        Ok(notes)
    }

    /// List notes awaiting moderation
    pub async fn list_pending(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE status = 'pending' ORDER BY created_at"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(notes)
    }

    /// Set a note's moderation status, returning the updated row.
    ///
    /// Rejected content is unreachable through the API, so the stored
    /// object is reclaimed unless another non-rejected note still points
    /// at it. Reclamation is best-effort.
    pub async fn set_status(&self, note_id: Uuid, status: NoteStatus) -> Result<Note> {
        let note = sqlx::query_as::<_, Note>(&format!(
            "UPDATE notes SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note_id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

        if status == NoteStatus::Rejected {
            let referenced: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM notes WHERE file_key = $1 AND status <> 'rejected')",
            )
            .bind(&note.file_key)
            .fetch_optional(&self.db)
            .await?;

            if referenced != Some(true) {
                if let Err(e) = self.storage.delete(&note.file_key).await {
                    tracing::warn!(note_id = %note.id, "Failed to reclaim rejected note content: {}", e);
                }
            }
        }

        Ok(note)
    }

    /// Load a note's file content from storage
    pub async fn load_content(&self, note: &Note) -> Result<Bytes> {
        self.storage.get(&note.file_key).await
    }

    /// Record a completed download, returning the download row.
    ///
    /// Two separate writes; neither is atomic with serving the response.
    pub async fn record_download(&self, note_id: Uuid, user_id: Option<Uuid>) -> Result<Download> {
        let download = sqlx::query_as::<_, Download>(
            "INSERT INTO downloads (note_id, user_id) VALUES ($1, $2) \
             RETURNING id, note_id, user_id, downloaded_at",
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        sqlx::query("UPDATE notes SET download_count = download_count + 1 WHERE id = $1")
            .bind(note_id)
            .execute(&self.db)
            .await?;

        Ok(download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_sha256_known_value() {
        // SHA-256 of the empty string
        assert_eq!(
            NoteService::calculate_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            NoteService::calculate_sha256(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_identical_content_has_identical_fingerprint() {
        let a = NoteService::calculate_sha256(b"lecture notes chapter 4");
        let b = NoteService::calculate_sha256(b"lecture notes chapter 4");
        let c = NoteService::calculate_sha256(b"lecture notes chapter 5");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

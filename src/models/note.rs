//! Note (uploaded document) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Moderation status of an uploaded note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Pending,
    Approved,
    Rejected,
}

/// Note entity.
///
/// `premium` and `requires_login` are independent gates: a note can be
/// login-gated without being premium, and vice versa.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Note {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(skip_serializing)]
    pub file_key: String,
    pub file_sha256: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub premium: bool,
    pub requires_login: bool,
    pub status: NoteStatus,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

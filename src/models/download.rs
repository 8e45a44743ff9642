//! Download record model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One download of a note; `user_id` is absent for anonymous downloads.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Download {
    pub id: Uuid,
    pub note_id: Uuid,
    pub user_id: Option<Uuid>,
    pub downloaded_at: DateTime<Utc>,
}

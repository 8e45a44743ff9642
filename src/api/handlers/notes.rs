//! Note handlers - upload, metadata, download, and moderation.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension, Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::note::{Note, NoteStatus};
use crate::services::access::{self, AccessDecision, AccessGates, DenyReason};
use crate::services::audit_service::{AuditAction, AuditEntry, AuditService, ResourceType};
use crate::services::notification_service::NotificationService;

/// Routes with optional auth (public reads, gated downloads)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/:id", get(get_note))
        .route("/:id/download", get(download_note))
}

/// Routes requiring authentication (uploads)
pub fn upload_router() -> Router<SharedState> {
    Router::new()
        .route("/", post(upload_note))
        // Uploaded PDFs; well above typical scans, well below abuse size
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
}

/// Routes requiring the staff role (moderation)
pub fn moderation_router() -> Router<SharedState> {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/:id/approve", post(approve_note))
        .route("/:id/reject", post(reject_note))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub subject_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub premium: bool,
    #[serde(default)]
    pub requires_login: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_sha256: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub premium: bool,
    pub requires_login: bool,
    pub status: NoteStatus,
    pub download_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            subject_id: note.subject_id,
            title: note.title,
            description: note.description,
            file_sha256: note.file_sha256,
            size_bytes: note.size_bytes,
            content_type: note.content_type,
            premium: note.premium,
            requires_login: note.requires_login,
            status: note.status,
            download_count: note.download_count,
            created_at: note.created_at,
        }
    }
}

/// Response body for a duplicate upload (409)
#[derive(Debug, Serialize)]
pub struct DuplicateResponse {
    pub code: &'static str,
    pub message: String,
    pub is_duplicate: bool,
    pub existing_note_id: Uuid,
}

/// Upload a note file.
///
/// The raw request body is the file; metadata travels in query parameters.
/// A duplicate fingerprint is rejected with 409 and the conflicting note's
/// id. The new note starts in pending status until moderated.
pub async fn upload_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<std::result::Result<(StatusCode, Json<NoteResponse>), (StatusCode, Json<DuplicateResponse>)>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/pdf")
        .to_string();

    let note_service = state.create_note_service();

    // Duplicate check before storing anything, so the client gets the
    // conflicting id in a structured body. The service re-checks on
    // insert; two concurrent identical uploads can still race past both
    // checks (last-write-wins duplicate, accepted).
    let fingerprint = crate::services::note_service::NoteService::calculate_sha256(&body);
    let dup = note_service.check_duplicate(&fingerprint).await?;
    if let Some(existing_id) = dup.existing_note_id {
        return Ok(Err((
            StatusCode::CONFLICT,
            Json(DuplicateResponse {
                code: "CONFLICT",
                message: "Identical file already uploaded".to_string(),
                is_duplicate: true,
                existing_note_id: existing_id,
            }),
        )));
    }

    let note = note_service
        .upload(
            params.subject_id,
            auth.user_id,
            &params.title,
            params.description.as_deref(),
            &content_type,
            params.premium,
            params.requires_login,
            body,
        )
        .await?;

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(AuditAction::NoteUploaded, ResourceType::Note)
                .user(auth.user_id)
                .resource(note.id),
        )
        .await;

    Ok(Ok((StatusCode::CREATED, Json(NoteResponse::from(note)))))
}

/// Get note metadata. Pending/rejected notes are visible to their
/// uploader and staff only.
pub async fn get_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthExtension>>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>> {
    let note = state.create_note_service().get_note(id).await?;

    if note.status != NoteStatus::Approved {
        let visible = auth
            .as_ref()
            .map(|a| a.user_id == note.user_id || a.role.is_staff())
            .unwrap_or(false);
        if !visible {
            return Err(AppError::NotFound("Note not found".to_string()));
        }
    }

    Ok(Json(NoteResponse::from(note)))
}

/// Download a note's file.
///
/// Applies the access decision: 401 when login is required, 403 when PRO
/// membership is required, 404 for unknown or unapproved notes, otherwise
/// the file bytes with a Content-Disposition attachment header.
pub async fn download_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<Option<AuthExtension>>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let note_service = state.create_note_service();
    let note = note_service.get_note(id).await?;

    // Unapproved notes do not exist as far as downloads are concerned,
    // except for the uploader and staff.
    if note.status != NoteStatus::Approved {
        let visible = auth
            .as_ref()
            .map(|a| a.user_id == note.user_id || a.role.is_staff())
            .unwrap_or(false);
        if !visible {
            return Err(AppError::NotFound("Note not found".to_string()));
        }
    }

    let identity = auth.as_ref().map(|a| a.identity());
    let gates = AccessGates {
        premium: note.premium,
        requires_login: note.requires_login,
    };

    match access::decide(gates, identity.as_ref()) {
        AccessDecision::Allow => {}
        AccessDecision::Deny(DenyReason::LoginRequired) => {
            return Err(AppError::Authentication("Login required".to_string()));
        }
        AccessDecision::Deny(DenyReason::ProRequired) => {
            return Err(AppError::Authorization(
                "PRO membership required".to_string(),
            ));
        }
    }

    let content = note_service.load_content(&note).await?;

    // Bookkeeping after the access decision; not atomic with the response
    let download = note_service
        .record_download(note.id, identity.map(|i| i.user_id))
        .await?;

    AuditService::new(state.db.clone())
        .log_best_effort({
            let mut entry = AuditEntry::new(AuditAction::NoteDownloaded, ResourceType::Note)
                .resource(note.id)
                .details(serde_json::json!({ "download_id": download.id }));
            if let Some(ref i) = identity {
                entry = entry.user(i.user_id);
            }
            entry
        })
        .await;

    let filename = format!("{}.pdf", note.title.replace(['/', '\\', '"'], "_"));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, note.content_type.as_str())
        .header(CONTENT_LENGTH, content.len())
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(content))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// List notes awaiting moderation (staff)
pub async fn list_pending(State(state): State<SharedState>) -> Result<Json<Vec<NoteResponse>>> {
    let notes = state.create_note_service().list_pending().await?;
    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

/// Approve a pending note (staff)
pub async fn approve_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>> {
    moderate(state, auth, id, NoteStatus::Approved).await
}

/// Reject a pending note (staff)
pub async fn reject_note(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteResponse>> {
    moderate(state, auth, id, NoteStatus::Rejected).await
}

async fn moderate(
    state: SharedState,
    auth: AuthExtension,
    note_id: Uuid,
    status: NoteStatus,
) -> Result<Json<NoteResponse>> {
    let note = state
        .create_note_service()
        .set_status(note_id, status)
        .await?;

    let (action, title, body) = match status {
        NoteStatus::Approved => (
            AuditAction::NoteApproved,
            "Note approved",
            format!("Your note \"{}\" is now visible to students.", note.title),
        ),
        _ => (
            AuditAction::NoteRejected,
            "Note rejected",
            format!("Your note \"{}\" was rejected by a moderator.", note.title),
        ),
    };

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(action, ResourceType::Note)
                .user(auth.user_id)
                .resource(note.id),
        )
        .await;

    NotificationService::new(state.db.clone())
        .notify_best_effort(note.user_id, title, &body)
        .await;

    Ok(Json(NoteResponse::from(note)))
}

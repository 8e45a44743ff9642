//! Catalog handlers - the course / semester / subject browse hierarchy.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::catalog::{Course, Semester, Subject};
use crate::models::note::Note;

/// Create catalog routes (public)
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/:id/semesters", get(list_semesters))
        .route("/semesters/:id/subjects", get(list_subjects))
        .route("/subjects/:id/notes", get(list_subject_notes))
}

/// Listing entry for a note; file details are withheld until download.
#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub premium: bool,
    pub requires_login: bool,
    pub size_bytes: i64,
    pub download_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Note> for NoteListItem {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            description: note.description,
            premium: note.premium,
            requires_login: note.requires_login,
            size_bytes: note.size_bytes,
            download_count: note.download_count,
            created_at: note.created_at,
        }
    }
}

/// List all courses
pub async fn list_courses(State(state): State<SharedState>) -> Result<Json<Vec<Course>>> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT id, name, slug, created_at FROM courses ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(courses))
}

/// List a course's semesters
pub async fn list_semesters(
    State(state): State<SharedState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Vec<Semester>>> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_optional(&state.db)
            .await?;
    if exists != Some(true) {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let semesters = sqlx::query_as::<_, Semester>(
        "SELECT id, course_id, number, created_at FROM semesters \
         WHERE course_id = $1 ORDER BY number",
    )
    .bind(course_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(semesters))
}

/// List a semester's subjects
pub async fn list_subjects(
    State(state): State<SharedState>,
    Path(semester_id): Path<Uuid>,
) -> Result<Json<Vec<Subject>>> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM semesters WHERE id = $1)")
            .bind(semester_id)
            .fetch_optional(&state.db)
            .await?;
    if exists != Some(true) {
        return Err(AppError::NotFound("Semester not found".to_string()));
    }

    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, semester_id, name, code, created_at FROM subjects \
         WHERE semester_id = $1 ORDER BY name",
    )
    .bind(semester_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(subjects))
}

/// List approved notes for a subject. Premium notes appear in the listing
/// with their flag; the gate applies at download time.
pub async fn list_subject_notes(
    State(state): State<SharedState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<NoteListItem>>> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
            .bind(subject_id)
            .fetch_optional(&state.db)
            .await?;
    if exists != Some(true) {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    let notes = state
        .create_note_service()
        .list_approved(subject_id)
        .await?;

    Ok(Json(notes.into_iter().map(NoteListItem::from).collect()))
}

//! Course / semester / subject browse hierarchy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Course entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Semester entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Semester {
    pub id: Uuid,
    pub course_id: Uuid,
    pub number: i32,
    pub created_at: DateTime<Utc>,
}

/// Subject entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subject {
    pub id: Uuid,
    pub semester_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

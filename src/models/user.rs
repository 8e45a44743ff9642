//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User role enum.
///
/// `Pro` is granted by a confirmed payment or by an admin. `Manager` is a
/// moderation role (note approval); `Admin` has full control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Free,
    Pro,
    Admin,
    Manager,
}

impl UserRole {
    /// Whether this role may access premium-flagged notes.
    pub fn has_premium_access(self) -> bool {
        matches!(self, UserRole::Pro | UserRole::Admin | UserRole::Manager)
    }

    /// Whether this role may moderate uploads.
    pub fn is_staff(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

/// User entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub phone: Option<String>,
    pub is_active: bool,
    pub must_change_password: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

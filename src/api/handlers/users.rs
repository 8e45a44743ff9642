//! User administration handlers (admin only).

use axum::{
    extract::{Extension, Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::UserRole;
use crate::services::audit_service::{AuditAction, AuditEntry, AuditService, ResourceType};
use crate::services::notification_service::NotificationService;

/// Create admin user-management routes
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id/role", put(set_user_role))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserListItem {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// List all users
pub async fn list_users(State(state): State<SharedState>) -> Result<Json<Vec<UserListItem>>> {
    let users = sqlx::query_as::<_, UserListItem>(
        "SELECT id, email, name, role, is_active, created_at FROM users ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

/// Set a user's role directly.
///
/// Manual override path, separate from payment-driven promotion. Admins
/// cannot change their own role, so the last admin cannot lock itself out.
pub async fn set_user_role(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<UserListItem>> {
    if user_id == auth.user_id {
        return Err(AppError::Validation(
            "Cannot change your own role".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, UserListItem>(
        "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 \
         RETURNING id, email, name, role, is_active, created_at",
    )
    .bind(payload.role)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(AuditAction::RoleChanged, ResourceType::User)
                .user(auth.user_id)
                .resource(user.id)
                .details(serde_json::json!({ "new_role": payload.role })),
        )
        .await;

    NotificationService::new(state.db.clone())
        .notify_best_effort(
            user.id,
            "Account updated",
            &format!("Your account role is now {:?}.", user.role),
        )
        .await;

    Ok(Json(user))
}

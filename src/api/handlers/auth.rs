//! Authentication handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::UserRole;
use crate::services::audit_service::{AuditAction, AuditEntry, AuditService, ResourceType};
use crate::services::auth_service::AuthService;

/// Create public auth routes (no auth required)
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh_token))
}

/// Create protected auth routes (auth required)
pub fn protected_router() -> Router<SharedState> {
    Router::new().route("/me", get(get_current_user))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Register a new account (FREE role)
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    let (user, tokens) = auth_service
        .register(
            &payload.email,
            &payload.name,
            &payload.password,
            payload.phone.as_deref(),
        )
        .await?;

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(AuditAction::UserRegistered, ResourceType::User)
                .user(user.id)
                .resource(user.id),
        )
        .await;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        token_type: "Bearer".to_string(),
        role: user.role,
    }))
}

/// Login with credentials
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));
    let audit = AuditService::new(state.db.clone());

    let (user, tokens) = match auth_service
        .authenticate(&payload.email, &payload.password)
        .await
    {
        Ok(ok) => ok,
        Err(e) => {
            audit
                .log_best_effort(
                    AuditEntry::new(AuditAction::LoginFailed, ResourceType::User)
                        .details(serde_json::json!({ "email": payload.email })),
                )
                .await;
            return Err(e);
        }
    };

    audit
        .log_best_effort(
            AuditEntry::new(AuditAction::Login, ResourceType::User)
                .user(user.id)
                .resource(user.id),
        )
        .await;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        token_type: "Bearer".to_string(),
        role: user.role,
    }))
}

/// Logout current session
pub async fn logout(State(_state): State<SharedState>) -> Result<()> {
    // JWT tokens are stateless, so logout is handled client-side.
    Ok(())
}

/// Refresh access token.
///
/// Re-reads the user row, so a role promoted since login shows up in the
/// new tokens. Clients call this after a confirmed payment.
pub async fn refresh_token(
    State(state): State<SharedState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>> {
    let auth_service = AuthService::new(state.db.clone(), Arc::new(state.config.clone()));

    let (user, tokens) = auth_service.refresh_tokens(&payload.refresh_token).await?;

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        token_type: "Bearer".to_string(),
        role: user.role,
    }))
}

/// Get current user info
pub async fn get_current_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<UserResponse>> {
    let user: Option<(Uuid, String, String, UserRole)> = sqlx::query_as(
        "SELECT id, email, name, role FROM users WHERE id = $1 AND is_active = true",
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?;

    let (id, email, name, role) =
        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse {
        id,
        email,
        name,
        role,
    }))
}

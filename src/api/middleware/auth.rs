//! Authentication middleware.
//!
//! Extracts and validates the `Authorization: Bearer <jwt>` header and
//! inserts the resolved identity into request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::models::user::UserRole;
use crate::services::access::RequestIdentity;
use crate::services::auth_service::{AuthService, Claims};

/// Extension that holds authenticated user information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<Claims> for AuthExtension {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl AuthExtension {
    /// View of this identity for the access decision function.
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Extract the bearer token from the Authorization header, if present.
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware - requires a valid access token.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        return (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response();
    };

    match auth_service.validate_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthExtension::from(claims));
            next.run(request).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}

/// Optional authentication middleware - allows unauthenticated requests.
///
/// Inserts `Option<AuthExtension>` so handlers can apply per-resource
/// gates (login-required, premium) themselves.
pub async fn optional_auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_ext = extract_bearer_token(&request)
        .and_then(|token| auth_service.validate_access_token(token).ok())
        .map(AuthExtension::from);

    request.extensions_mut().insert(auth_ext);
    next.run(request).await
}

/// Staff-only middleware - requires the ADMIN or MANAGER role.
pub async fn staff_middleware(
    State(auth_service): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Response {
    require_role(auth_service, request, next, |role| role.is_staff()).await
}

/// Admin-only middleware - requires the ADMIN role.
pub async fn admin_middleware(
    State(auth_service): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Response {
    require_role(auth_service, request, next, |role| {
        matches!(role, UserRole::Admin)
    })
    .await
}

async fn require_role(
    auth_service: Arc<AuthService>,
    mut request: Request,
    next: Next,
    allowed: impl Fn(UserRole) -> bool,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        return (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response();
    };

    let claims = match auth_service.validate_access_token(token) {
        Ok(claims) => claims,
        Err(_) => {
            return (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
        }
    };

    if !allowed(claims.role) {
        return (StatusCode::FORBIDDEN, "Insufficient role").into_response();
    }

    request.extensions_mut().insert(AuthExtension::from(claims));
    next.run(request).await
}

//! Route definitions for the API.

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use super::handlers;
use super::middleware::auth::{
    admin_middleware, auth_middleware, optional_auth_middleware, staff_middleware,
};
use super::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use super::middleware::security_headers::security_headers_middleware;
use super::SharedState;
use crate::services::auth_service::AuthService;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    let router = Router::new()
        // Health endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/healthz", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/readyz", get(handlers::health::readiness_check))
        // API v1 routes
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(middleware::from_fn(security_headers_middleware));

    router.with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: SharedState) -> Router<SharedState> {
    // Create an AuthService for middleware use
    let auth_service = Arc::new(AuthService::new(
        state.db.clone(),
        Arc::new(state.config.clone()),
    ));

    // Rate limiters: strict for auth and payments (30 req/min), general
    // for the rest of the API (1000 req/min)
    let auth_rate_limiter = Arc::new(RateLimiter::new(30, 60));
    let payment_rate_limiter = Arc::new(RateLimiter::new(30, 60));
    let api_rate_limiter = Arc::new(RateLimiter::new(1000, 60));

    Router::new()
        // Auth routes - split into public and protected (rate limited)
        .nest(
            "/auth",
            handlers::auth::public_router().layer(middleware::from_fn_with_state(
                auth_rate_limiter,
                rate_limit_middleware,
            )),
        )
        .nest(
            "/auth",
            handlers::auth::protected_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        // Course / semester / subject browsing is public
        .merge(handlers::catalog::router())
        // Note metadata and downloads carry optional auth; the handlers
        // apply the login/premium gates per note
        .nest(
            "/notes",
            handlers::notes::public_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                optional_auth_middleware,
            )),
        )
        // Uploads require a session
        .nest(
            "/notes",
            handlers::notes::upload_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                auth_middleware,
            )),
        )
        // Moderation requires staff
        .nest(
            "/notes",
            handlers::notes::moderation_router().layer(middleware::from_fn_with_state(
                auth_service.clone(),
                staff_middleware,
            )),
        )
        // Payment order creation requires a session; callbacks are public.
        // Both sides share the strict rate limiter.
        .nest(
            "/payments",
            handlers::payments::protected_router()
                .layer(middleware::from_fn_with_state(
                    auth_service.clone(),
                    auth_middleware,
                ))
                .layer(middleware::from_fn_with_state(
                    payment_rate_limiter.clone(),
                    rate_limit_middleware,
                )),
        )
        .nest(
            "/payments",
            handlers::payments::public_router().layer(middleware::from_fn_with_state(
                payment_rate_limiter,
                rate_limit_middleware,
            )),
        )
        // User management routes require admin privileges
        .nest(
            "/users",
            handlers::users::router().layer(middleware::from_fn_with_state(
                auth_service,
                admin_middleware,
            )),
        )
        // General API rate limiting per IP
        .layer(middleware::from_fn_with_state(
            api_rate_limiter,
            rate_limit_middleware,
        ))
}

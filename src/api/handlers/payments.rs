//! Payment handlers - order creation, checkout verification, UPI polling.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::Result;
use crate::services::audit_service::{AuditAction, AuditEntry, AuditService, ResourceType};
use crate::services::payment_service::VerificationOutcome;

/// Routes requiring authentication (order creation)
pub fn protected_router() -> Router<SharedState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/upi/orders", post(create_upi_order))
}

/// Routes reachable without a session. Checkout callbacks and UPI status
/// polls arrive from clients that may not carry a token; the ledger row
/// decides who gets promoted, not the caller.
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/verify", post(verify_payment))
        .route("/upi/status", post(poll_upi_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUpiOrderRequest {
    pub order_id: String,
    pub amount: u64,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct UpiStatusRequest {
    pub order_id: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: &'static str,
}

impl From<VerificationOutcome> for VerifyResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        let status = match outcome {
            VerificationOutcome::Verified | VerificationOutcome::AlreadyVerified => "success",
            VerificationOutcome::Failed => "failed",
            VerificationOutcome::Pending => "pending",
        };
        Self { status }
    }
}

/// Create a card-gateway order for the authenticated user.
///
/// The response carries the gateway order id and public key id, which the
/// client feeds to the checkout widget. The rupee amount is converted to
/// paise server-side.
pub async fn create_order(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>)> {
    let order = state
        .create_payment_service()
        .create_order(auth.user_id, payload.amount, &payload.currency)
        .await?;

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(AuditAction::OrderCreated, ResourceType::Order)
                .user(auth.user_id)
                .details(serde_json::json!({
                    "gateway_order_id": order.id,
                    "amount_minor": order.amount,
                })),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: state.config.gateway_key_id.clone(),
        }),
    ))
}

/// Record a UPI order in the ledger for the authenticated user.
pub async fn create_upi_order(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateUpiOrderRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>)> {
    let order = state
        .create_payment_service()
        .create_upi_order(auth.user_id, &payload.order_id, payload.amount, &payload.phone)
        .await?;

    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(AuditAction::OrderCreated, ResourceType::Order)
                .user(auth.user_id)
                .resource(order.id)
                .details(serde_json::json!({
                    "gateway": "upi",
                    "gateway_order_id": order.gateway_order_id,
                })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(VerifyResponse { status: "created" })))
}

/// Verify a checkout callback signature.
///
/// On a valid signature the order is marked verified and its owning user
/// promoted, atomically. Re-posting a verified order succeeds without
/// re-running the promotion. A bad signature returns 200 with
/// `{"status":"failed"}` - the request itself was well-formed.
pub async fn verify_payment(
    State(state): State<SharedState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyResponse>> {
    let (order, outcome) = state
        .create_payment_service()
        .verify_payment(&payload.order_id, &payload.payment_id, &payload.signature)
        .await?;

    let action = if outcome.is_success() {
        AuditAction::PaymentVerified
    } else {
        AuditAction::PaymentFailed
    };
    AuditService::new(state.db.clone())
        .log_best_effort(
            AuditEntry::new(action, ResourceType::Order)
                .user(order.user_id)
                .resource(order.id)
                .details(serde_json::json!({
                    "gateway_order_id": payload.order_id,
                    "payment_id": payload.payment_id,
                })),
        )
        .await;

    Ok(Json(VerifyResponse::from(outcome)))
}

/// Poll the UPI gateway for an order's transaction status.
///
/// The phone number must match the one recorded at order creation; the
/// promotion target is always the ledger row's user.
pub async fn poll_upi_status(
    State(state): State<SharedState>,
    Json(payload): Json<UpiStatusRequest>,
) -> Result<Json<VerifyResponse>> {
    let (order, outcome) = state
        .create_payment_service()
        .poll_upi_status(&payload.order_id, &payload.phone)
        .await?;

    if outcome != VerificationOutcome::Pending {
        let action = if outcome.is_success() {
            AuditAction::PaymentVerified
        } else {
            AuditAction::PaymentFailed
        };
        AuditService::new(state.db.clone())
            .log_best_effort(
                AuditEntry::new(action, ResourceType::Order)
                    .user(order.user_id)
                    .resource(order.id)
                    .details(serde_json::json!({
                        "gateway": "upi",
                        "gateway_order_id": payload.order_id,
                    })),
            )
            .await;
    }

    Ok(Json(VerifyResponse::from(outcome)))
}

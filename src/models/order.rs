//! Payment order ledger model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Verified,
    Failed,
}

/// Payment ledger row.
///
/// Recorded at order creation, bound to the authenticated user. Promotion
/// on confirmed payment is keyed by `user_id`; `phone` is only a
/// cross-check on the UPI status-poll path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gateway: String,
    pub gateway_order_id: String,
    pub receipt: String,
    pub amount_minor: i64,
    pub currency: String,
    pub phone: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

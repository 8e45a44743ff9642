//! Payment bridge service.
//!
//! Creates payment-gateway orders, verifies checkout signatures, polls the
//! alternate UPI gateway for transaction status, and promotes user roles on
//! confirmed payment.
//!
//! Every payment attempt is recorded in the `orders` ledger at creation
//! time, bound to the authenticated user. Verification and promotion run in
//! a single transaction keyed by the ledger's user id, so a confirmed
//! payment can never promote anyone but the user who opened the order.

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::order::{Order, OrderStatus};

type HmacSha256 = Hmac<Sha256>;

const ORDER_COLUMNS: &str = "id, user_id, gateway, gateway_order_id, receipt, amount_minor, \
     currency, phone, status, created_at, verified_at";

/// Gateway identifiers stored in the ledger
pub const GATEWAY_CARD: &str = "razorpay";
pub const GATEWAY_UPI: &str = "upi";

/// Order object returned by the card gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response body of the UPI gateway's order-status endpoint
#[derive(Debug, Deserialize)]
struct UpiStatusResponse {
    #[serde(rename = "txnStatus")]
    txn_status: Option<String>,
    #[serde(rename = "msg", default)]
    message: Option<String>,
}

/// Outcome of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Signature (or polled status) checked out; the order is verified and
    /// the owning user holds the PRO role.
    Verified,
    /// The order was already verified; nothing was re-run.
    AlreadyVerified,
    /// Signature mismatch or terminal gateway failure; no promotion.
    Failed,
    /// The gateway reports the transaction as still in flight.
    Pending,
}

impl VerificationOutcome {
    /// Whether the caller should report success to the client.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Verified | Self::AlreadyVerified)
    }
}

/// Convert a rupee amount to paise, the gateway's minor unit.
///
/// Amounts arrive from clients as bare u64s; the conversion checks for
/// overflow instead of wrapping into a wrong charge.
pub fn rupees_to_paise(rupees: u64) -> Result<i64> {
    rupees
        .checked_mul(100)
        .and_then(|paise| i64::try_from(paise).ok())
        .ok_or_else(|| AppError::Validation("Amount too large".to_string()))
}

/// Compute the checkout signature: hex HMAC-SHA256 over
/// `"<order_id>|<payment_id>"` with the gateway secret.
pub fn compute_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a checkout signature in constant time.
///
/// The supplied signature is hex-decoded and compared via `Mac::verify_slice`,
/// which is constant-time. Malformed hex fails closed.
pub fn verify_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Payment bridge service
pub struct PaymentService {
    db: PgPool,
    config: Arc<Config>,
    client: Client,
}

impl PaymentService {
    /// Create a new payment service with a timeout-bounded HTTP client.
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { db, config, client }
    }

    /// Create a card-gateway order and record it in the ledger.
    ///
    /// The amount is converted to paise before it reaches the gateway.
    /// Gateway or network failure is terminal: no ledger row is written and
    /// the caller receives a gateway error.
    pub async fn create_order(
        &self,
        user_id: Uuid,
        amount_rupees: u64,
        currency: &str,
    ) -> Result<GatewayOrder> {
        if amount_rupees == 0 {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }

        let amount_minor = rupees_to_paise(amount_rupees)?;
        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());

        let url = format!("{}/orders", self.config.gateway_api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.gateway_key_id, Some(&self.config.gateway_key_secret))
            .json(&serde_json::json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Order creation failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Gateway rejected order creation: {} - {}",
                status, body
            )));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed gateway response: {}", e)))?;

        sqlx::query(
            "INSERT INTO orders (user_id, gateway, gateway_order_id, receipt, amount_minor, currency) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user_id)
        .bind(GATEWAY_CARD)
        .bind(&order.id)
        .bind(&receipt)
        .bind(amount_minor)
        .bind(currency)
        .execute(&self.db)
        .await?;

        tracing::info!(
            user_id = %user_id,
            order_id = %order.id,
            amount_minor,
            "Payment order created"
        );

        Ok(order)
    }

    /// Create a UPI-gateway order record. The UPI gateway tracks the order
    /// itself; we only need the ledger row binding it to the user.
    pub async fn create_upi_order(
        &self,
        user_id: Uuid,
        gateway_order_id: &str,
        amount_rupees: u64,
        phone: &str,
    ) -> Result<Order> {
        if amount_rupees == 0 {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }
        if gateway_order_id.is_empty() {
            return Err(AppError::Validation("Missing order id".to_string()));
        }

        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, gateway, gateway_order_id, receipt, amount_minor, currency, phone) \
             VALUES ($1, $2, $3, $4, $5, 'INR', $6) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(GATEWAY_UPI)
        .bind(gateway_order_id)
        .bind(&receipt)
        .bind(rupees_to_paise(amount_rupees)?)
        .bind(phone)
        .fetch_one(&self.db)
        .await?;

        Ok(order)
    }

    /// Verify a checkout callback signature and promote the order's user.
    ///
    /// Re-verifying an already-verified order is an idempotent success: the
    /// promotion does not run twice.
    pub async fn verify_payment(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(Order, VerificationOutcome)> {
        let order = self.find_order(gateway_order_id).await?;

        match order.status {
            OrderStatus::Verified => return Ok((order, VerificationOutcome::AlreadyVerified)),
            OrderStatus::Failed => {
                // A failed order can still present a valid signature later
                // (e.g. a retried checkout); fall through and re-check.
            }
            OrderStatus::Created => {}
        }

        if verify_signature(
            gateway_order_id,
            payment_id,
            signature,
            &self.config.gateway_key_secret,
        ) {
            self.confirm_order(&order).await?;
            Ok((order, VerificationOutcome::Verified))
        } else {
            self.mark_failed(&order).await?;
            tracing::warn!(order_id = %gateway_order_id, "Payment signature mismatch");
            Ok((order, VerificationOutcome::Failed))
        }
    }

    /// Poll the UPI gateway for an order's transaction status and promote
    /// the order's user when the gateway reports success.
    ///
    /// The supplied phone number is a cross-check against the ledger row;
    /// promotion itself is keyed by the row's user id.
    pub async fn poll_upi_status(
        &self,
        gateway_order_id: &str,
        phone: &str,
    ) -> Result<(Order, VerificationOutcome)> {
        let order = self.find_order(gateway_order_id).await?;

        if let Some(ref stored_phone) = order.phone {
            if stored_phone != phone {
                return Err(AppError::Validation(
                    "Phone number does not match order".to_string(),
                ));
            }
        }

        if order.status == OrderStatus::Verified {
            return Ok((order, VerificationOutcome::AlreadyVerified));
        }

        let gateway_url = self
            .config
            .upi_gateway_url
            .as_deref()
            .ok_or_else(|| AppError::Config("UPI_GATEWAY_URL not set".to_string()))?;
        let user_token = self
            .config
            .upi_gateway_token
            .as_deref()
            .ok_or_else(|| AppError::Config("UPI_GATEWAY_TOKEN not set".to_string()))?;

        let response = self
            .client
            .post(gateway_url)
            .json(&serde_json::json!({
                "order_id": gateway_order_id,
                "user_token": user_token,
            }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Status poll failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "UPI gateway returned status {}",
                response.status()
            )));
        }

        let status: UpiStatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed UPI gateway response: {}", e)))?;

        match status.txn_status.as_deref() {
            Some("SUCCESS") => {
                self.confirm_order(&order).await?;
                Ok((order, VerificationOutcome::Verified))
            }
            Some("FAILURE") | Some("FAILED") => {
                self.mark_failed(&order).await?;
                Ok((order, VerificationOutcome::Failed))
            }
            other => {
                tracing::debug!(
                    order_id = %gateway_order_id,
                    txn_status = ?other,
                    message = ?status.message,
                    "UPI transaction not yet terminal"
                );
                Ok((order, VerificationOutcome::Pending))
            }
        }
    }

    /// Fetch a ledger order by its gateway order id.
    async fn find_order(&self, gateway_order_id: &str) -> Result<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = $1"
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    /// Flip the ledger row to verified and promote the owning user to PRO,
    /// in one transaction. Staff roles are left untouched.
    async fn confirm_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE orders SET status = 'verified', verified_at = NOW() \
             WHERE id = $1 AND status <> 'verified'",
        )
        .bind(order.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET role = 'pro', updated_at = NOW() WHERE id = $1 AND role = 'free'")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.gateway_order_id,
            user_id = %order.user_id,
            "Payment verified, user promoted to PRO"
        );

        Ok(())
    }

    /// Mark a pending ledger row as failed.
    async fn mark_failed(&self, order: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET status = 'failed' WHERE id = $1 AND status = 'created'")
            .bind(order.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_gateway_secret";

    #[test]
    fn test_rupees_to_paise() {
        assert_eq!(rupees_to_paise(500).unwrap(), 50_000);
        assert_eq!(rupees_to_paise(1).unwrap(), 100);
        assert_eq!(rupees_to_paise(0).unwrap(), 0);
    }

    #[test]
    fn test_rupees_to_paise_rejects_overflow() {
        assert!(rupees_to_paise(u64::MAX).is_err());
        // Overflows u64 in the multiply
        assert!(rupees_to_paise(u64::MAX / 100 + 1).is_err());
        // Fits u64 but not i64
        assert!(rupees_to_paise(i64::MAX as u64 / 100 + 1).is_err());
        // Largest convertible amount
        assert!(rupees_to_paise(i64::MAX as u64 / 100).is_ok());
    }

    #[test]
    fn test_signature_round_trip() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert!(verify_signature("order_123", "pay_456", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_mutated_order_id() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert!(!verify_signature("order_124", "pay_456", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_mutated_payment_id() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert!(!verify_signature("order_123", "pay_457", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_mutated_signature() {
        let mut sig = compute_signature("order_123", "pay_456", SECRET);
        // Flip the last hex character
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_signature("order_123", "pay_456", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert!(!verify_signature("order_123", "pay_456", &sig, "other_secret"));
    }

    #[test]
    fn test_signature_rejects_malformed_hex() {
        assert!(!verify_signature("order_123", "pay_456", "not-hex!", SECRET));
        assert!(!verify_signature("order_123", "pay_456", "", SECRET));
    }

    #[test]
    fn test_signature_covers_field_boundary() {
        // "a|bc" and "ab|c" must not collide: the separator is part of
        // the signed message
        let sig = compute_signature("a", "bc", SECRET);
        assert!(!verify_signature("ab", "c", &sig, SECRET));
    }

    #[test]
    fn test_outcome_success_mapping() {
        assert!(VerificationOutcome::Verified.is_success());
        assert!(VerificationOutcome::AlreadyVerified.is_success());
        assert!(!VerificationOutcome::Failed.is_success());
        assert!(!VerificationOutcome::Pending.is_success());
    }
}

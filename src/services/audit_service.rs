//! Audit logging service.
//!
//! Tracks significant actions (auth, moderation, payments, role changes)
//! for compliance and debugging.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// Audit action types
#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    // Authentication
    Login,
    LoginFailed,
    UserRegistered,

    // Content
    NoteUploaded,
    NoteApproved,
    NoteRejected,
    NoteDownloaded,

    // Payments
    OrderCreated,
    PaymentVerified,
    PaymentFailed,

    // Administration
    RoleChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::UserRegistered => "USER_REGISTERED",
            AuditAction::NoteUploaded => "NOTE_UPLOADED",
            AuditAction::NoteApproved => "NOTE_APPROVED",
            AuditAction::NoteRejected => "NOTE_REJECTED",
            AuditAction::NoteDownloaded => "NOTE_DOWNLOADED",
            AuditAction::OrderCreated => "ORDER_CREATED",
            AuditAction::PaymentVerified => "PAYMENT_VERIFIED",
            AuditAction::PaymentFailed => "PAYMENT_FAILED",
            AuditAction::RoleChanged => "ROLE_CHANGED",
        }
    }
}

/// Resource types for audit logging
#[derive(Debug, Clone, Copy)]
pub enum ResourceType {
    User,
    Note,
    Order,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Note => "note",
            ResourceType::Order => "order",
        }
    }
}

/// Audit log entry builder
pub struct AuditEntry {
    user_id: Option<Uuid>,
    action: AuditAction,
    resource_type: ResourceType,
    resource_id: Option<String>,
    details: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, resource_type: ResourceType) -> Self {
        Self {
            user_id: None,
            action,
            resource_type,
            resource_id: None,
            details: None,
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource(mut self, resource_id: impl ToString) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Audit service
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Log an audit entry. Failures are reported to the caller; most call
    /// sites log-and-continue rather than failing the main operation.
    pub async fn log(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (user_id, action, resource_type, resource_id, details) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type.as_str())
        .bind(entry.resource_id)
        .bind(entry.details)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Log an entry, warning on failure instead of propagating it.
    pub async fn log_best_effort(&self, entry: AuditEntry) {
        let action = entry.action.as_str();
        if let Err(e) = self.log(entry).await {
            tracing::warn!(action, "Audit write failed: {}", e);
        }
    }
}

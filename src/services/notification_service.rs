//! Notification service.
//!
//! Writes notification rows for moderation decisions and role changes.
//! Delivery (web UI polling) is outside this service.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::notification::Notification;

/// Notification service
pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a notification for a user, returning the stored row
    pub async fn notify(&self, user_id: Uuid, title: &str, body: &str) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, title, body) VALUES ($1, $2, $3) \
             RETURNING id, user_id, title, body, is_read, created_at",
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.db)
        .await?;

        Ok(notification)
    }

    /// Create a notification, warning on failure instead of propagating it.
    /// Used where the notification must not fail the main operation.
    pub async fn notify_best_effort(&self, user_id: Uuid, title: &str, body: &str) {
        match self.notify(user_id, title, body).await {
            Ok(n) => {
                tracing::debug!(notification_id = %n.id, user_id = %user_id, "Notification written");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Notification write failed: {}", e);
            }
        }
    }
}

//! Notification service for in-app notifications
//!
//! Workflow services record a notification for the other party whenever a
//! request is created, answered, resent or auto-cancelled. Delivery failures
//! never fail the operation that triggered them.

use chrono::{DateTime, Utc};
use shared::{Notification, NotificationKind};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Notification service for managing notifications
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

/// Entity a notification points at
#[derive(Debug, Clone, Copy)]
pub struct EntityRef {
    pub entity_type: &'static str,
    pub entity_id: Uuid,
}

impl EntityRef {
    pub fn new(entity_type: &'static str, entity_id: Uuid) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

/// A notification waiting to be stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub entity: Option<EntityRef>,
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    message: String,
    entity_type: Option<String>,
    entity_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().unwrap_or(NotificationKind::System);
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind,
            title: row.title,
            message: row.message,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, entity_type, entity_id, is_read, created_at";

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store a notification for a user
    pub async fn create(&self, input: NewNotification) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.kind.as_str())
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.entity.map(|e| e.entity_type))
        .bind(input.entity.map(|e| e.entity_id))
        .fetch_one(&self.db)
        .await?;

        Notification::try_from(row)
    }

    /// Store a notification, logging instead of failing
    pub async fn notify(&self, input: NewNotification) {
        let user_id = input.user_id;
        let kind = input.kind;
        if let Err(e) = self.create(input).await {
            tracing::warn!(
                user_id = %user_id,
                kind = kind.as_str(),
                "Failed to store notification: {}",
                e
            );
        }
    }

    /// Get notifications for a user, newest first
    pub async fn list(&self, user_id: Uuid, unread_only: bool, limit: i64) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE user_id = $1 AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(limit.clamp(1, 200))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Count unread notifications
    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Mark one notification as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications SET is_read = true
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))?;

        Notification::try_from(row)
    }

    /// Mark all of a user's notifications as read, returning how many changed
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

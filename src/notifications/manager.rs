/// Notification storage and per-recipient read state
use crate::{
    db::parse_timestamp,
    error::{ApiError, ApiResult},
    notifications::{Notification, NotificationPayload, RETENTION_DAYS},
};
use chrono::{Duration, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationManager {
    db: SqlitePool,
}

impl NotificationManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert one notification row
    pub async fn create(
        &self,
        recipient_id: &str,
        payload: &NotificationPayload,
    ) -> ApiResult<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO notifications
                 (id, recipient_id, title, message, kind, category,
                  related_model, related_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(recipient_id)
        .bind(&payload.title)
        .bind(&payload.message)
        .bind(payload.kind.as_str())
        .bind(payload.category.as_str())
        .bind(&payload.related_model)
        .bind(&payload.related_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        crate::metrics::NOTIFICATIONS_CREATED
            .with_label_values(&[payload.category.as_str()])
            .inc();

        Ok(Notification {
            id,
            recipient_id: recipient_id.to_string(),
            title: payload.title.clone(),
            message: payload.message.clone(),
            kind: payload.kind.as_str().to_string(),
            category: payload.category.as_str().to_string(),
            related_model: payload.related_model.clone(),
            related_id: payload.related_id.clone(),
            is_read: false,
            is_email_sent: false,
            created_at: now,
        })
    }

    /// Bulk fan-out: one row per recipient, all identical except recipient
    pub async fn create_bulk(
        &self,
        recipient_ids: &[String],
        payload: &NotificationPayload,
    ) -> ApiResult<Vec<Notification>> {
        let mut created = Vec::with_capacity(recipient_ids.len());
        for recipient in recipient_ids {
            created.push(self.create(recipient, payload).await?);
        }
        Ok(created)
    }

    /// List notifications for a user, newest first
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: i64,
    ) -> ApiResult<Vec<Notification>> {
        let query = if unread_only {
            "SELECT * FROM notifications
             WHERE recipient_id = ?1 AND is_read = 0
             ORDER BY created_at DESC LIMIT ?2"
        } else {
            "SELECT * FROM notifications
             WHERE recipient_id = ?1
             ORDER BY created_at DESC LIMIT ?2"
        };

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(map_notification).collect()
    }

    /// Unread count for a user
    pub async fn unread_count(&self, user_id: &str) -> ApiResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM notifications
             WHERE recipient_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row.get("count"))
    }

    /// Mark one notification read; scoped to its recipient
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> ApiResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1
             WHERE id = ?1 AND recipient_id = ?2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        Ok(())
    }

    /// Mark all of the requesting user's notifications read, never cross-user
    pub async fn mark_all_read(&self, user_id: &str) -> ApiResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1
             WHERE recipient_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete one notification; scoped to its recipient
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> ApiResult<()> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        Ok(())
    }

    /// Record that the email side effect went out
    pub async fn mark_email_sent(&self, notification_id: &str) -> ApiResult<()> {
        sqlx::query("UPDATE notifications SET is_email_sent = 1 WHERE id = ?1")
            .bind(notification_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Retention sweep: remove rows older than the 30-day window
    pub async fn cleanup_expired(&self) -> ApiResult<u64> {
        let cutoff = (Utc::now() - Duration::days(RETENTION_DAYS)).to_rfc3339();
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < ?1")
            .bind(&cutoff)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

fn map_notification(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Notification> {
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        title: row.get("title"),
        message: row.get("message"),
        kind: row.get("kind"),
        category: row.get("category"),
        related_model: row.get("related_model"),
        related_id: row.get("related_id"),
        is_read: row.get("is_read"),
        is_email_sent: row.get("is_email_sent"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{NotificationCategory, NotificationKind};

    fn payload(title: &str) -> NotificationPayload {
        NotificationPayload {
            title: title.to_string(),
            message: "message".to_string(),
            kind: NotificationKind::Info,
            category: NotificationCategory::System,
            related_model: None,
            related_id: None,
            send_email: false,
        }
    }

    async fn seed_user(db: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at)
             VALUES (?1, ?2, 'x', 'A', 'B', 'student', ?3)",
        )
        .bind(id)
        .bind(format!("{}@school.bg", id))
        .bind(Utc::now().to_rfc3339())
        .execute(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn bulk_create_and_list() {
        let db = crate::db::test_pool().await;
        seed_user(&db, "u1").await;
        seed_user(&db, "u2").await;
        let manager = NotificationManager::new(db);

        let recipients = vec!["u1".to_string(), "u2".to_string()];
        let created = manager.create_bulk(&recipients, &payload("hello")).await.unwrap();
        assert_eq!(created.len(), 2);

        let u1_list = manager.list_for_user("u1", false, 50).await.unwrap();
        assert_eq!(u1_list.len(), 1);
        assert_eq!(u1_list[0].title, "hello");
        assert!(!u1_list[0].is_read);
    }

    #[tokio::test]
    async fn mark_all_read_is_scoped_to_requester() {
        let db = crate::db::test_pool().await;
        seed_user(&db, "u1").await;
        seed_user(&db, "u2").await;
        let manager = NotificationManager::new(db);

        manager.create("u1", &payload("a")).await.unwrap();
        manager.create("u1", &payload("b")).await.unwrap();
        manager.create("u2", &payload("c")).await.unwrap();

        let updated = manager.mark_all_read("u1").await.unwrap();
        assert_eq!(updated, 2);

        assert_eq!(manager.unread_count("u1").await.unwrap(), 0);
        // The other user's rows are untouched
        assert_eq!(manager.unread_count("u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_read_rejects_foreign_notification() {
        let db = crate::db::test_pool().await;
        seed_user(&db, "u1").await;
        seed_user(&db, "u2").await;
        let manager = NotificationManager::new(db);

        let n = manager.create("u1", &payload("a")).await.unwrap();
        let err = manager.mark_read("u2", &n.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn retention_sweep_removes_only_old_rows() {
        let db = crate::db::test_pool().await;
        seed_user(&db, "u1").await;
        let manager = NotificationManager::new(db.clone());

        let fresh = manager.create("u1", &payload("fresh")).await.unwrap();

        // Backdate one row past the retention window
        let old = manager.create("u1", &payload("old")).await.unwrap();
        let stale = (Utc::now() - Duration::days(RETENTION_DAYS + 1)).to_rfc3339();
        sqlx::query("UPDATE notifications SET created_at = ?1 WHERE id = ?2")
            .bind(&stale)
            .bind(&old.id)
            .execute(&db)
            .await
            .unwrap();

        let removed = manager.cleanup_expired().await.unwrap();
        assert_eq!(removed, 1);

        let remaining = manager.list_for_user("u1", false, 50).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);
    }
}

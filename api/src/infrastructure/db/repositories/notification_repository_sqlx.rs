use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::domain::notifications::notification::{
    Channel, DeliveryStatus, NewNotification, Notification,
};
use crate::infrastructure::db::PgPool;

const NOTIFICATION_COLUMNS: &str = "id, user_id, channel, title, body, data, status, attempts, last_error, external_id, read_at, sent_at, created_at";

fn map_notification(r: &PgRow) -> anyhow::Result<Notification> {
    let channel: String = r.get("channel");
    let status: String = r.get("status");
    Ok(Notification {
        id: r.get("id"),
        user_id: r.get("user_id"),
        channel: channel.parse()?,
        title: r.get("title"),
        body: r.get("body"),
        data: r.get("data"),
        status: status.parse()?,
        attempts: r.get("attempts"),
        last_error: r.try_get("last_error").ok().flatten(),
        external_id: r.try_get("external_id").ok().flatten(),
        read_at: r.try_get("read_at").ok().flatten(),
        sent_at: r.try_get("sent_at").ok().flatten(),
        created_at: r.get("created_at"),
    })
}

/// Postgres-backed outbox. Rows are claimed with `FOR UPDATE SKIP LOCKED` so
/// several dispatchers can drain the same table.
pub struct SqlxNotificationRepository {
    pub pool: PgPool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn enqueue(
        &self,
        notification: NewNotification,
        status: DeliveryStatus,
    ) -> anyhow::Result<Notification> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO notifications (user_id, channel, title, body, data, status, sent_at)
               VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $6 = 'sent' THEN now() END)
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(notification.user_id)
        .bind(notification.channel.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.data)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        map_notification(&row)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> anyhow::Result<Page<Notification>> {
        let channel = Channel::InApp.as_str();
        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(1) FROM notifications
               WHERE user_id = $1 AND channel = $2 AND ($3 = FALSE OR read_at IS NULL)"#,
        )
        .bind(user_id)
        .bind(channel)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query(&format!(
            r#"SELECT {NOTIFICATION_COLUMNS} FROM notifications
               WHERE user_id = $1 AND channel = $2 AND ($3 = FALSE OR read_at IS NULL)
               ORDER BY created_at DESC
               LIMIT $4 OFFSET $5"#
        ))
        .bind(user_id)
        .bind(channel)
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(map_notification)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE notifications SET read_at = COALESCE(read_at, now()), updated_at = now()
               WHERE id = $1 AND user_id = $2 AND channel = $3"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Channel::InApp.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"UPDATE notifications SET read_at = now(), updated_at = now()
               WHERE user_id = $1 AND channel = $2 AND read_at IS NULL"#,
        )
        .bind(user_id)
        .bind(Channel::InApp.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn claim_pending(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            r#"UPDATE notifications SET status = 'processing', attempts = attempts + 1, updated_at = now()
               WHERE id IN (
                   SELECT id FROM notifications
                   WHERE status = 'pending'
                      OR (status = 'processing' AND updated_at < $2)
                   ORDER BY created_at
                   LIMIT $1
                   FOR UPDATE SKIP LOCKED
               )
               RETURNING {NOTIFICATION_COLUMNS}"#
        ))
        .bind(limit)
        .bind(stale_before)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_notification).collect()
    }

    async fn mark_sent(&self, id: Uuid, external_id: Option<&str>) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE notifications SET status = 'sent', external_id = $2, sent_at = now(), updated_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(external_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failure(
        &self,
        id: Uuid,
        error: &str,
        status: DeliveryStatus,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE notifications SET status = $2, last_error = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_by_external_id(
        &self,
        external_id: &str,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE notifications SET status = $2, last_error = COALESCE($3, last_error), updated_at = now()
               WHERE external_id = $1"#,
        )
        .bind(external_id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

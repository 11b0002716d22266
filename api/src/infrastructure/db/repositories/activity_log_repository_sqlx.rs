use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::activity_log_repository::{ActivityFilter, ActivityLogRepository};
use crate::domain::activity::activity_log::{ActivityLog, NewActivity};
use crate::infrastructure::db::PgPool;

const FILTER: &str = r#"($1::uuid IS NULL OR actor_id = $1)
    AND ($2::text IS NULL OR subject = $2)
    AND ($3::text IS NULL OR action = $3)"#;

fn map_entry(r: &PgRow) -> ActivityLog {
    ActivityLog {
        id: r.get("id"),
        actor_id: r.try_get("actor_id").ok().flatten(),
        action: r.get("action"),
        subject: r.get("subject"),
        subject_id: r.try_get("subject_id").ok().flatten(),
        metadata: r.get("metadata"),
        ip: r.try_get("ip").ok().flatten(),
        created_at: r.get("created_at"),
    }
}

pub struct SqlxActivityLogRepository {
    pub pool: PgPool,
}

impl SqlxActivityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogRepository for SqlxActivityLogRepository {
    async fn record(&self, entry: NewActivity) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO activity_logs (actor_id, action, subject, subject_id, metadata, ip)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.subject)
        .bind(entry.subject_id.as_deref())
        .bind(&entry.metadata)
        .bind(entry.ip.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> anyhow::Result<Page<ActivityLog>> {
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(1) FROM activity_logs WHERE {FILTER}"
        ))
        .bind(filter.actor_id)
        .bind(filter.subject.as_deref())
        .bind(filter.action.as_deref())
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query(&format!(
            r#"SELECT id, actor_id, action, subject, subject_id, metadata, ip, created_at
               FROM activity_logs WHERE {FILTER}
               ORDER BY created_at DESC
               LIMIT $4 OFFSET $5"#
        ))
        .bind(filter.actor_id)
        .bind(filter.subject.as_deref())
        .bind(filter.action.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::new(rows.iter().map(map_entry).collect(), total, page))
    }
}

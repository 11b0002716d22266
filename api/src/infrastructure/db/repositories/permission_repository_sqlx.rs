use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::permission_repository::PermissionRepository;
use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::Permission;
use crate::infrastructure::db::PgPool;

pub(crate) fn map_permission(r: &PgRow) -> anyhow::Result<Permission> {
    let action: String = r.get("action");
    let subject: String = r.get("subject");
    Ok(Permission {
        id: r.get("id"),
        action: action.parse()?,
        subject: subject.parse()?,
        inverted: r.get("inverted"),
        description: r.try_get("description").ok().flatten(),
        created_at: r.get("created_at"),
    })
}

pub struct SqlxPermissionRepository {
    pub pool: PgPool,
}

impl SqlxPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for SqlxPermissionRepository {
    async fn list(&self) -> anyhow::Result<Vec<Permission>> {
        let rows = sqlx::query(
            r#"SELECT id, action, subject, inverted, description, created_at
               FROM permissions ORDER BY subject, action, inverted"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_permission).collect()
    }

    async fn find(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
    ) -> anyhow::Result<Option<Permission>> {
        let row = sqlx::query(
            r#"SELECT id, action, subject, inverted, description, created_at
               FROM permissions WHERE action = $1 AND subject = $2 AND inverted = $3"#,
        )
        .bind(action.as_str())
        .bind(subject.as_str())
        .bind(inverted)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_permission).transpose()
    }

    async fn create(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
        description: Option<&str>,
    ) -> anyhow::Result<Permission> {
        let row = sqlx::query(
            r#"INSERT INTO permissions (action, subject, inverted, description)
               VALUES ($1, $2, $3, $4)
               RETURNING id, action, subject, inverted, description, created_at"#,
        )
        .bind(action.as_str())
        .bind(subject.as_str())
        .bind(inverted)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        map_permission(&row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM permissions WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }
}

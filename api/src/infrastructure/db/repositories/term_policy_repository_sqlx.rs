use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::term_policy_repository::TermPolicyRepository;
use crate::domain::terms::term_policy::TermPolicy;
use crate::infrastructure::db::PgPool;

const POLICY_COLUMNS: &str =
    "id, kind, version, title, content, published_at, created_at, updated_at";

fn map_policy(r: &PgRow) -> TermPolicy {
    TermPolicy {
        id: r.get("id"),
        kind: r.get("kind"),
        version: r.get("version"),
        title: r.get("title"),
        content: r.get("content"),
        published_at: r.try_get("published_at").ok().flatten(),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

pub struct SqlxTermPolicyRepository {
    pub pool: PgPool,
}

impl SqlxTermPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TermPolicyRepository for SqlxTermPolicyRepository {
    async fn list(&self, include_drafts: bool) -> anyhow::Result<Vec<TermPolicy>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {POLICY_COLUMNS} FROM term_policies
               WHERE deleted_at IS NULL AND ($1 OR published_at IS NOT NULL)
               ORDER BY kind, created_at DESC"#
        ))
        .bind(include_drafts)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_policy).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<TermPolicy>> {
        let row = sqlx::query(&format!(
            "SELECT {POLICY_COLUMNS} FROM term_policies WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_policy))
    }

    async fn create(
        &self,
        kind: &str,
        version: &str,
        title: &str,
        content: &str,
    ) -> anyhow::Result<Option<TermPolicy>> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO term_policies (kind, version, title, content)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (kind, version) WHERE deleted_at IS NULL DO NOTHING
               RETURNING {POLICY_COLUMNS}"#
        ))
        .bind(kind)
        .bind(version)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_policy))
    }

    async fn update_draft(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> anyhow::Result<Option<TermPolicy>> {
        let row = sqlx::query(&format!(
            r#"UPDATE term_policies SET
                 title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 updated_at = now()
               WHERE id = $1 AND deleted_at IS NULL AND published_at IS NULL
               RETURNING {POLICY_COLUMNS}"#
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_policy))
    }

    async fn publish(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<Option<TermPolicy>> {
        let row = sqlx::query(&format!(
            r#"UPDATE term_policies SET published_at = $2, updated_at = now()
               WHERE id = $1 AND deleted_at IS NULL AND published_at IS NULL
               RETURNING {POLICY_COLUMNS}"#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_policy))
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE term_policies SET deleted_at = now(), updated_at = now()
               WHERE id = $1 AND deleted_at IS NULL AND published_at IS NULL"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn accepted_policy_ids(&self, user_id: Uuid) -> anyhow::Result<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT policy_id FROM term_policy_acceptances WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn record_acceptance(
        &self,
        policy_id: Uuid,
        user_id: Uuid,
        ip: Option<&str>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"INSERT INTO term_policy_acceptances (policy_id, user_id, ip)
               VALUES ($1, $2, $3)
               ON CONFLICT (policy_id, user_id) DO NOTHING"#,
        )
        .bind(policy_id)
        .bind(user_id)
        .bind(ip)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

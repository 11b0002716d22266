use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::domain::auth::api_key::ApiKey;
use crate::infrastructure::db::PgPool;

const KEY_COLUMNS: &str =
    "id, user_id, name, prefix, is_active, expires_at, last_used_at, created_at, deleted_at";

fn map_key(r: &PgRow) -> ApiKey {
    ApiKey {
        id: r.get("id"),
        user_id: r.get("user_id"),
        name: r.get("name"),
        prefix: r.get("prefix"),
        is_active: r.get("is_active"),
        expires_at: r.try_get("expires_at").ok().flatten(),
        last_used_at: r.try_get("last_used_at").ok().flatten(),
        created_at: r.get("created_at"),
        deleted_at: r.try_get("deleted_at").ok().flatten(),
    }
}

pub struct SqlxApiKeyRepository {
    pub pool: PgPool,
}

impl SqlxApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for SqlxApiKeyRepository {
    async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        prefix: &str,
        key_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<ApiKey> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO api_keys (user_id, name, prefix, key_hash, expires_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {KEY_COLUMNS}"#
        ))
        .bind(user_id)
        .bind(name)
        .bind(prefix)
        .bind(key_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_key(&row))
    }

    async fn find_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKey>> {
        let row = sqlx::query(&format!("SELECT {KEY_COLUMNS} FROM api_keys WHERE key_hash = $1"))
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_key))
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ApiKey>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {KEY_COLUMNS} FROM api_keys
               WHERE user_id = $1 AND deleted_at IS NULL
               ORDER BY created_at DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_key).collect())
    }

    async fn revoke(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE api_keys SET deleted_at = now(), is_active = FALSE, updated_at = now()
               WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "UPDATE api_keys SET is_active = FALSE, updated_at = now() WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn touch(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

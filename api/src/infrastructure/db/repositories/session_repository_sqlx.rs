use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::session_repository::{NewSession, SessionRepository};
use crate::domain::auth::session::Session;
use crate::infrastructure::db::PgPool;

const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, user_agent, ip, expires_at, revoked_at, last_used_at, created_at";

fn map_session(r: &PgRow) -> Session {
    Session {
        id: r.get("id"),
        user_id: r.get("user_id"),
        refresh_token_hash: r.get("refresh_token_hash"),
        user_agent: r.try_get("user_agent").ok().flatten(),
        ip: r.try_get("ip").ok().flatten(),
        expires_at: r.get("expires_at"),
        revoked_at: r.try_get("revoked_at").ok().flatten(),
        last_used_at: r.try_get("last_used_at").ok().flatten(),
        created_at: r.get("created_at"),
    }
}

pub struct SqlxSessionRepository {
    pub pool: PgPool,
}

impl SqlxSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: NewSession) -> anyhow::Result<Session> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO sessions (id, user_id, refresh_token_hash, user_agent, ip, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {SESSION_COLUMNS}"#
        ))
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(session.user_agent.as_deref())
        .bind(session.ip.as_deref())
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_session(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_session))
    }

    async fn rotate_refresh(
        &self,
        id: Uuid,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE sessions SET refresh_token_hash = $2, expires_at = $3, updated_at = now()
               WHERE id = $1 AND revoked_at IS NULL"#,
        )
        .bind(id)
        .bind(refresh_token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn touch(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE sessions SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE sessions SET revoked_at = now(), updated_at = now() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn revoke_for_user(&self, user_id: Uuid, keep: Option<Uuid>) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"UPDATE sessions SET revoked_at = now(), updated_at = now()
               WHERE user_id = $1 AND revoked_at IS NULL
                 AND ($2::uuid IS NULL OR id <> $2)"#,
        )
        .bind(user_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_session).collect())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> anyhow::Result<u64> {
        let res = sqlx::query(
            "DELETE FROM sessions WHERE expires_at < $1 OR (revoked_at IS NOT NULL AND revoked_at < $1)",
        )
        .bind(before)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}

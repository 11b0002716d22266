use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::users::user::{User, UserCredentials};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::repositories::like_pattern;

const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.is_active, u.created_at, u.updated_at,
           COALESCE(array_agg(r.name ORDER BY r.name) FILTER (WHERE r.id IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id AND r.deleted_at IS NULL
"#;

fn map_user(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        name: r.get("name"),
        is_active: r.get("is_active"),
        roles: r.try_get("roles").unwrap_or_default(),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn map_credentials(r: &PgRow) -> UserCredentials {
    UserCredentials {
        id: r.get("id"),
        password_hash: r.get("password_hash"),
        is_active: r.get("is_active"),
    }
}

pub struct SqlxUserRepository {
    pub pool: PgPool,
}

impl SqlxUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let row = sqlx::query(
            r#"INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3)
               RETURNING id, email, name, is_active, created_at, updated_at"#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_user(&row))
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(n > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1 AND u.deleted_at IS NULL GROUP BY u.id");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(map_user))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>> {
        let row = sqlx::query(
            r#"SELECT id, password_hash, is_active FROM users
               WHERE lower(email) = lower($1) AND deleted_at IS NULL"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_credentials))
    }

    async fn find_credentials_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserCredentials>> {
        let row = sqlx::query(
            "SELECT id, password_hash, is_active FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_credentials))
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> anyhow::Result<Page<User>> {
        let pattern = search.map(like_pattern);
        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(1) FROM users u
               WHERE u.deleted_at IS NULL
                 AND ($1::text IS NULL OR u.email ILIKE $1 OR u.name ILIKE $1)"#,
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;
        let sql = format!(
            r#"{USER_SELECT}
               WHERE u.deleted_at IS NULL
                 AND ($1::text IS NULL OR u.email ILIKE $1 OR u.name ILIKE $1)
               GROUP BY u.id
               ORDER BY u.created_at DESC
               LIMIT $2 OFFSET $3"#
        );
        let rows = sqlx::query(&sql)
            .bind(pattern.as_deref())
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(Page::new(rows.iter().map(map_user).collect(), total, page))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> anyhow::Result<Option<User>> {
        let res = sqlx::query(
            r#"UPDATE users SET
                 name = COALESCE($2, name),
                 is_active = COALESCE($3, is_active),
                 updated_at = now()
               WHERE id = $1 AND deleted_at IS NULL"#,
        )
        .bind(id)
        .bind(name)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id)
               SELECT $1, unnest($2::uuid[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(user_id)
        .bind(role_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET deleted_at = now(), is_active = FALSE, updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::role_repository::RoleRepository;
use crate::domain::access::role::{Permission, Role};
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::repositories::permission_repository_sqlx::map_permission;

const ROLE_COLUMNS: &str = "id, name, description, is_system, created_at, updated_at";

fn map_role(r: &PgRow) -> Role {
    Role {
        id: r.get("id"),
        name: r.get("name"),
        description: r.try_get("description").ok().flatten(),
        is_system: r.get("is_system"),
        permissions: Vec::new(),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

pub struct SqlxRoleRepository {
    pub pool: PgPool,
}

impl SqlxRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_permissions(&self, mut roles: Vec<Role>) -> anyhow::Result<Vec<Role>> {
        if roles.is_empty() {
            return Ok(roles);
        }
        let ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        let rows = sqlx::query(
            r#"SELECT rp.role_id, p.id, p.action, p.subject, p.inverted, p.description, p.created_at
               FROM role_permissions rp
               JOIN permissions p ON p.id = rp.permission_id
               WHERE rp.role_id = ANY($1)
               ORDER BY p.created_at"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut by_role: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for row in &rows {
            let role_id: Uuid = row.get("role_id");
            by_role.entry(role_id).or_default().push(map_permission(row)?);
        }
        for role in roles.iter_mut() {
            role.permissions = by_role.remove(&role.id).unwrap_or_default();
        }
        Ok(roles)
    }

    async fn one(&self, row: Option<PgRow>) -> anyhow::Result<Option<Role>> {
        match row {
            Some(row) => Ok(self.with_permissions(vec![map_role(&row)]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RoleRepository for SqlxRoleRepository {
    async fn list(&self) -> anyhow::Result<Vec<Role>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE deleted_at IS NULL ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.with_permissions(rows.iter().map(map_role).collect()).await
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Role>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.one(row).await
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1 AND deleted_at IS NULL"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        self.one(row).await
    }

    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        is_system: bool,
    ) -> anyhow::Result<Role> {
        let row = sqlx::query(&format!(
            "INSERT INTO roles (name, description, is_system) VALUES ($1, $2, $3) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(is_system)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_role(&row))
    }

    async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> anyhow::Result<Option<Role>> {
        let row = sqlx::query(&format!(
            r#"UPDATE roles SET
                 name = COALESCE($2, name),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 updated_at = now()
               WHERE id = $1 AND deleted_at IS NULL
               RETURNING {ROLE_COLUMNS}"#
        ))
        .bind(id)
        .bind(name)
        .bind(description.is_some())
        .bind(description.flatten())
        .fetch_optional(&self.pool)
        .await?;
        self.one(row).await
    }

    async fn set_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"INSERT INTO role_permissions (role_id, permission_id)
               SELECT $1, unnest($2::uuid[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE roles SET updated_at = now() WHERE id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE roles SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn roles_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Role>> {
        let rows = sqlx::query(
            r#"SELECT r.id, r.name, r.description, r.is_system, r.created_at, r.updated_at
               FROM user_roles ur
               JOIN roles r ON r.id = ur.role_id
               WHERE ur.user_id = $1 AND r.deleted_at IS NULL
               ORDER BY r.name"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.with_permissions(rows.iter().map(map_role).collect()).await
    }

    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM roles WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(found)
    }
}

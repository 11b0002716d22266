use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::files_repository::{FilesRepository, NewStoredFile};
use crate::domain::files::stored_file::StoredFile;
use crate::infrastructure::db::PgPool;

const FILE_COLUMNS: &str =
    "id, owner_id, filename, content_type, size, storage_key, content_hash, created_at";

fn map_file(r: &PgRow) -> StoredFile {
    StoredFile {
        id: r.get("id"),
        owner_id: r.get("owner_id"),
        filename: r.get("filename"),
        content_type: r.try_get("content_type").ok().flatten(),
        size: r.get("size"),
        storage_key: r.get("storage_key"),
        content_hash: r.get("content_hash"),
        created_at: r.get("created_at"),
    }
}

pub struct SqlxFilesRepository {
    pub pool: PgPool,
}

impl SqlxFilesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FilesRepository for SqlxFilesRepository {
    async fn insert_file(&self, file: NewStoredFile) -> anyhow::Result<StoredFile> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO files (owner_id, filename, content_type, size, storage_key, content_hash)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {FILE_COLUMNS}"#
        ))
        .bind(file.owner_id)
        .bind(&file.filename)
        .bind(file.content_type.as_deref())
        .bind(file.size)
        .bind(&file.storage_key)
        .bind(&file.content_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_file(&row))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<StoredFile>> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(map_file))
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> anyhow::Result<Page<StoredFile>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM files WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query(&format!(
            r#"SELECT {FILE_COLUMNS} FROM files
               WHERE owner_id = $1 AND deleted_at IS NULL
               ORDER BY created_at DESC
               LIMIT $2 OFFSET $3"#
        ))
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(Page::new(rows.iter().map(map_file).collect(), total, page))
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE files SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

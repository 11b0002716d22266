use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::files::stored_file::StoredFile;

#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub owner_id: Uuid,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub storage_key: String,
    pub content_hash: String,
}

#[async_trait]
pub trait FilesRepository: Send + Sync {
    async fn insert_file(&self, file: NewStoredFile) -> anyhow::Result<StoredFile>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<StoredFile>>;
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> anyhow::Result<Page<StoredFile>>;
    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub filename: String,
    pub size: i64,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub key: String,
    pub url: String,
    pub method: String,
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn put(
        &self,
        owner_id: Uuid,
        original_filename: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<StoredObject>;
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// `None` when the backend cannot hand out direct URLs.
    async fn presign_get(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<String>>;
    async fn presign_put(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: Option<&str>,
        ttl: Duration,
    ) -> anyhow::Result<Option<PresignedUpload>>;
}

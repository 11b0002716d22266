use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::auth::api_key::ApiKey;

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        prefix: &str,
        key_hash: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> anyhow::Result<ApiKey>;
    /// Includes revoked keys so callers can tell them apart from unknown ones.
    async fn find_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKey>>;
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<ApiKey>>;
    async fn revoke(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    async fn deactivate_for_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
    async fn touch(&self, id: Uuid) -> anyhow::Result<()>;
}

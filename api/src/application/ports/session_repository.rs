use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::auth::session::Session;

#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: NewSession) -> anyhow::Result<Session>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Session>>;
    async fn rotate_refresh(
        &self,
        id: Uuid,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
    async fn touch(&self, id: Uuid) -> anyhow::Result<()>;
    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Revokes every live session of the user except `keep`. Returns how many were revoked.
    async fn revoke_for_user(&self, user_id: Uuid, keep: Option<Uuid>) -> anyhow::Result<u64>;
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Session>>;
    async fn purge_expired(&self, before: DateTime<Utc>) -> anyhow::Result<u64>;
}

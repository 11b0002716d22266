use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::access::ability::{Action, Subject};
use crate::domain::access::role::Permission;

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Permission>>;
    async fn find(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
    ) -> anyhow::Result<Option<Permission>>;
    async fn create(
        &self,
        action: Action,
        subject: Subject,
        inverted: bool,
        description: Option<&str>,
    ) -> anyhow::Result<Permission>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>>;
}

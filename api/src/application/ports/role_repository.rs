use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::access::role::Role;

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Role>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Role>>;
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        is_system: bool,
    ) -> anyhow::Result<Role>;
    // description: None => not provided; Some(None) => clear
    async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> anyhow::Result<Option<Role>>;
    async fn set_permissions(&self, role_id: Uuid, permission_ids: &[Uuid]) -> anyhow::Result<()>;
    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Live roles only, permissions included.
    async fn roles_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Role>>;
    /// Ids from `ids` that reference live roles.
    async fn existing_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>>;
}

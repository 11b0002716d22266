use async_trait::async_trait;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::users::user::{User, UserCredentials};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>>;
    async fn find_credentials_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserCredentials>>;
    async fn list(&self, search: Option<&str>, page: PageRequest) -> anyhow::Result<Page<User>>;
    // None leaves a field untouched
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> anyhow::Result<Option<User>>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;
    async fn set_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> anyhow::Result<()>;
    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

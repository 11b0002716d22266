use uuid::Uuid;

use crate::application::errors::AppResult;
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::domain::auth::api_key::ApiKey;

pub struct ListApiKeys<'a, R: ApiKeyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: ApiKeyRepository + ?Sized> ListApiKeys<'a, R> {
    pub async fn execute(&self, user_id: Uuid) -> AppResult<Vec<ApiKey>> {
        Ok(self.repo.list_for_user(user_id).await?)
    }
}

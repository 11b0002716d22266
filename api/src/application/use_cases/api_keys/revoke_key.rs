use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::api_key_repository::ApiKeyRepository;

pub struct RevokeApiKey<'a, R: ApiKeyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: ApiKeyRepository + ?Sized> RevokeApiKey<'a, R> {
    pub async fn execute(&self, user_id: Uuid, key_id: Uuid) -> AppResult<()> {
        if !self.repo.revoke(key_id, user_id).await? {
            return Err(AppError::code(ErrorCode::ApiKeyNotFound));
        }
        tracing::info!(%user_id, api_key_id = %key_id, "api_key_revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryDb;
    use crate::application::use_cases::api_keys::list_keys::ListApiKeys;

    #[tokio::test]
    async fn revokes_only_own_keys() {
        let db = MemoryDb::default();
        let owner = Uuid::new_v4();
        let key = db.create(owner, "ci", "ak_12345678", "hash", None).await.unwrap();
        let uc = RevokeApiKey { repo: &db };

        let err = uc.execute(Uuid::new_v4(), key.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ApiKeyNotFound);

        uc.execute(owner, key.id).await.unwrap();
        assert!(ListApiKeys { repo: &db }.execute(owner).await.unwrap().is_empty());
        // second revoke finds nothing
        let err = uc.execute(owner, key.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ApiKeyNotFound);
    }
}

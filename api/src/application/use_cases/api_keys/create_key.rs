use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult};
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::services::secrets::{generate_api_key, sha256_hex};
use crate::domain::auth::api_key::{ApiKey, display_prefix};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Key metadata plus the plaintext, which is never retrievable again.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub key: ApiKey,
    pub plaintext: String,
}

pub struct CreateApiKey<'a, R: ApiKeyRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: ApiKeyRepository + ?Sized> CreateApiKey<'a, R> {
    pub async fn execute(&self, user_id: Uuid, req: &CreateApiKeyRequest) -> AppResult<IssuedApiKey> {
        req.validate()?;
        if let Some(exp) = req.expires_at {
            if exp <= Utc::now() {
                return Err(AppError::validation("expires_at: must be in the future"));
            }
        }
        let plaintext = generate_api_key();
        let key = self
            .repo
            .create(
                user_id,
                req.name.trim(),
                &display_prefix(&plaintext),
                &sha256_hex(&plaintext),
                req.expires_at,
            )
            .await?;
        tracing::info!(%user_id, api_key_id = %key.id, prefix = %key.prefix, "api_key_created");
        Ok(IssuedApiKey { key, plaintext })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ErrorCode;
    use crate::application::testing::MemoryDb;
    use crate::domain::auth::api_key::API_KEY_PREFIX_LEN;

    #[tokio::test]
    async fn stores_hash_and_prefix_only() {
        let db = MemoryDb::default();
        let user = Uuid::new_v4();
        let issued = CreateApiKey { repo: &db }
            .execute(
                user,
                &CreateApiKeyRequest {
                    name: "deploy".into(),
                    expires_at: None,
                },
            )
            .await
            .unwrap();
        assert!(issued.plaintext.starts_with("ak_"));
        assert_eq!(issued.key.prefix.len(), API_KEY_PREFIX_LEN);
        assert!(issued.plaintext.starts_with(&issued.key.prefix));
        let found = db.find_by_hash(&sha256_hex(&issued.plaintext)).await.unwrap();
        assert_eq!(found.map(|k| k.id), Some(issued.key.id));
    }

    #[tokio::test]
    async fn past_expiry_is_rejected() {
        let db = MemoryDb::default();
        let err = CreateApiKey { repo: &db }
            .execute(
                Uuid::new_v4(),
                &CreateApiKeyRequest {
                    name: "old".into(),
                    expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
    }
}

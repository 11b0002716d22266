use chrono::Utc;
use uuid::Uuid;

use crate::application::access::{AuthMethod, Principal, ability_for_user};
use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::secrets::sha256_hex;
use crate::domain::auth::api_key::API_KEY_MARKER;
use crate::domain::auth::session::SessionState;

async fn require_active_user<U>(users: &U, user_id: Uuid) -> AppResult<()>
where
    U: UserRepository + ?Sized,
{
    match users.find_credentials_by_id(user_id).await? {
        Some(c) if c.is_active => Ok(()),
        Some(_) => Err(AppError::code(ErrorCode::UserInactive)),
        None => Err(AppError::code(ErrorCode::Unauthorized)),
    }
}

/// Resolves a principal from the claims of a verified access token.
pub struct AuthenticateSession<'a, S, U, R>
where
    S: SessionRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub sessions: &'a S,
    pub users: &'a U,
    pub roles: &'a R,
}

impl<'a, S, U, R> AuthenticateSession<'a, S, U, R>
where
    S: SessionRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub async fn execute(&self, user_id: Uuid, session_id: Uuid) -> AppResult<Principal> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| AppError::code(ErrorCode::SessionInvalid))?;
        match session.state_at(Utc::now()) {
            SessionState::Active => {}
            SessionState::Revoked => return Err(AppError::code(ErrorCode::SessionInvalid)),
            SessionState::Expired => return Err(AppError::code(ErrorCode::SessionExpired)),
        }
        require_active_user(self.users, user_id).await?;
        let ability = ability_for_user(self.roles, user_id).await?;
        Ok(Principal {
            user_id,
            method: AuthMethod::Session(session_id),
            ability,
        })
    }
}

/// Checks that an `x-api-key` value is known, active and unexpired.
pub struct AuthenticateApiKey<'a, K, U, R>
where
    K: ApiKeyRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub api_keys: &'a K,
    pub users: &'a U,
    pub roles: &'a R,
}

impl<'a, K, U, R> AuthenticateApiKey<'a, K, U, R>
where
    K: ApiKeyRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
{
    pub async fn execute(&self, plaintext: &str) -> AppResult<Principal> {
        let plaintext = plaintext.trim();
        if !plaintext.starts_with(API_KEY_MARKER) {
            return Err(AppError::code(ErrorCode::ApiKeyInvalid));
        }
        let key = self
            .api_keys
            .find_by_hash(&sha256_hex(plaintext))
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::ApiKeyInvalid))?;
        if let Err(rejection) = key.check_usable(Utc::now()) {
            tracing::debug!(api_key_id = %key.id, ?rejection, "api_key_rejected");
            return Err(rejection.into());
        }
        require_active_user(self.users, key.user_id).await?;

        if let Err(err) = self.api_keys.touch(key.id).await {
            tracing::warn!(api_key_id = %key.id, error = ?err, "api_key_touch_failed");
        }
        let ability = ability_for_user(self.roles, key.user_id).await?;
        Ok(Principal {
            user_id: key.user_id,
            method: AuthMethod::ApiKey(key.id),
            ability,
        })
    }
}

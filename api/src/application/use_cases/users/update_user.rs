use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::use_cases::users::ensure_roles_exist;
use crate::domain::users::user::User;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces the role set when present.
    pub role_ids: Option<Vec<Uuid>>,
}

pub struct UpdateUser<'a, U, R, S, K>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
    S: SessionRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    pub users: &'a U,
    pub roles: &'a R,
    pub sessions: &'a S,
    pub api_keys: &'a K,
}

impl<'a, U, R, S, K> UpdateUser<'a, U, R, S, K>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
    S: SessionRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    pub async fn execute(&self, id: Uuid, req: &UpdateUserRequest) -> AppResult<User> {
        req.validate()?;
        if let Some(role_ids) = &req.role_ids {
            ensure_roles_exist(self.roles, role_ids).await?;
        }
        let user = self
            .users
            .update_profile(id, req.name.as_deref().map(str::trim), req.is_active)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::UserNotFound))?;
        if let Some(role_ids) = &req.role_ids {
            self.users.set_roles(id, role_ids).await?;
        }
        if req.is_active == Some(false) {
            let sessions = self.sessions.revoke_for_user(id, None).await?;
            let keys = self.api_keys.deactivate_for_user(id).await?;
            tracing::info!(user_id = %id, sessions, keys, "user_deactivated");
        }
        Ok(self.users.find_by_id(id).await?.unwrap_or(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::session_repository::NewSession;
    use crate::application::testing::{MemoryDb, seed_user};

    #[tokio::test]
    async fn replaces_roles_and_deactivation_cuts_access() {
        let db = MemoryDb::default();
        let user = seed_user(&db, "ada@example.com", "correct horse", vec![]).await;
        let role = RoleRepository::create(&db, "editor", None, false).await.unwrap();
        let session = SessionRepository::create(
            &db,
            NewSession {
                id: Uuid::new_v4(),
                user_id: user.id,
                refresh_token_hash: "h".into(),
                user_agent: None,
                ip: None,
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            },
        )
        .await
        .unwrap();
        let key = ApiKeyRepository::create(&db, user.id, "ci", "ak_1234567", "h", None)
            .await
            .unwrap();

        let uc = UpdateUser {
            users: &db,
            roles: &db,
            sessions: &db,
            api_keys: &db,
        };
        let updated = uc
            .execute(
                user.id,
                &UpdateUserRequest {
                    is_active: Some(false),
                    role_ids: Some(vec![role.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.roles, vec!["editor".to_string()]);
        assert!(db.session(session.id).unwrap().revoked_at.is_some());
        let keys = ApiKeyRepository::list_for_user(&db, user.id).await.unwrap();
        assert!(keys.iter().all(|k| k.id != key.id || !k.is_active));
    }

    #[tokio::test]
    async fn unknown_user() {
        let db = MemoryDb::default();
        let err = UpdateUser {
            users: &db,
            roles: &db,
            sessions: &db,
            api_keys: &db,
        }
        .execute(Uuid::new_v4(), &UpdateUserRequest::default())
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::UserNotFound);
    }
}

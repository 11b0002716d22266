use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::api_key_repository::ApiKeyRepository;
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::user_repository::UserRepository;

/// Soft-deletes an account and cuts off every credential it holds.
pub struct DeleteUser<'a, U, S, K>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    pub users: &'a U,
    pub sessions: &'a S,
    pub api_keys: &'a K,
}

impl<'a, U, S, K> DeleteUser<'a, U, S, K>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    K: ApiKeyRepository + ?Sized,
{
    pub async fn execute(&self, actor_id: Uuid, id: Uuid) -> AppResult<()> {
        if actor_id == id {
            return Err(AppError::validation("users cannot delete themselves"));
        }
        if !self.users.soft_delete(id).await? {
            return Err(AppError::code(ErrorCode::UserNotFound));
        }
        let sessions = self.sessions.revoke_for_user(id, None).await?;
        let keys = self.api_keys.deactivate_for_user(id).await?;
        tracing::info!(user_id = %id, %actor_id, sessions, keys, "user_deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryDb, seed_user};

    fn uc(db: &MemoryDb) -> DeleteUser<'_, MemoryDb, MemoryDb, MemoryDb> {
        DeleteUser {
            users: db,
            sessions: db,
            api_keys: db,
        }
    }

    #[tokio::test]
    async fn self_delete_is_a_validation_error() {
        let db = MemoryDb::default();
        let me = seed_user(&db, "ada@example.com", "correct horse", vec![]).await;
        let err = uc(&db).execute(me.id, me.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn deleted_user_disappears_and_email_frees_up() {
        let db = MemoryDb::default();
        let admin = seed_user(&db, "root@example.com", "correct horse", vec![]).await;
        let victim = seed_user(&db, "ada@example.com", "correct horse", vec![]).await;
        uc(&db).execute(admin.id, victim.id).await.unwrap();

        assert!(UserRepository::find_by_id(&db, victim.id).await.unwrap().is_none());
        assert!(!db.email_exists("ada@example.com").await.unwrap());
        let err = uc(&db).execute(admin.id, victim.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::UserNotFound);
    }
}

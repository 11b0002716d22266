use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::secrets::{
    compose_refresh_token, constant_time_eq, random_token, sha256_hex, split_refresh_token,
};
use crate::domain::auth::session::SessionState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub refresh_token: String,
}

/// Rotates the refresh secret of a session. Presenting a stale secret revokes
/// the session since it means the token was copied.
pub struct Refresh<'a, U, S>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
{
    pub users: &'a U,
    pub sessions: &'a S,
    pub refresh_ttl: chrono::Duration,
}

impl<'a, U, S> Refresh<'a, U, S>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
{
    pub async fn execute(&self, token: &str) -> AppResult<RefreshOutcome> {
        let (session_id, secret) =
            split_refresh_token(token).ok_or_else(|| AppError::code(ErrorCode::SessionInvalid))?;
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::SessionInvalid))?;

        let now = Utc::now();
        match session.state_at(now) {
            SessionState::Active => {}
            SessionState::Revoked => return Err(AppError::code(ErrorCode::SessionInvalid)),
            SessionState::Expired => return Err(AppError::code(ErrorCode::SessionExpired)),
        }

        if !constant_time_eq(&session.refresh_token_hash, &sha256_hex(secret)) {
            self.sessions.revoke(session.id).await?;
            tracing::warn!(session_id = %session.id, user_id = %session.user_id, "refresh_token_reuse_detected");
            return Err(AppError::code(ErrorCode::SessionInvalid));
        }

        match self.users.find_credentials_by_id(session.user_id).await? {
            Some(creds) if creds.is_active => {}
            Some(_) => {
                self.sessions.revoke(session.id).await?;
                return Err(AppError::code(ErrorCode::UserInactive));
            }
            None => {
                self.sessions.revoke(session.id).await?;
                return Err(AppError::code(ErrorCode::SessionInvalid));
            }
        }

        let next = random_token(32);
        let rotated = self
            .sessions
            .rotate_refresh(session.id, &sha256_hex(&next), now + self.refresh_ttl)
            .await?;
        if !rotated {
            return Err(AppError::code(ErrorCode::SessionInvalid));
        }
        self.sessions.touch(session.id).await?;

        Ok(RefreshOutcome {
            user_id: session.user_id,
            session_id: session.id,
            refresh_token: compose_refresh_token(session.id, &next),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryDb, seed_user};
    use crate::application::use_cases::auth::ClientInfo;
    use crate::application::use_cases::auth::login::{Login, LoginRequest};

    async fn logged_in(db: &MemoryDb) -> (Uuid, String) {
        seed_user(db, "ada@example.com", "correct horse", vec![]).await;
        let out = Login {
            users: db,
            sessions: db,
            policies: db,
            refresh_ttl: chrono::Duration::days(1),
        }
        .execute(
            &LoginRequest {
                email: "ada@example.com".into(),
                password: "correct horse".into(),
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap();
        (out.session.id, out.refresh_token)
    }

    fn refresh(db: &MemoryDb) -> Refresh<'_, MemoryDb, MemoryDb> {
        Refresh {
            users: db,
            sessions: db,
            refresh_ttl: chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn rotates_secret_and_keeps_session() {
        let db = MemoryDb::default();
        let (sid, token) = logged_in(&db).await;
        let out = refresh(&db).execute(&token).await.unwrap();
        assert_eq!(out.session_id, sid);
        assert_ne!(out.refresh_token, token);

        // the new token works, the session is still active
        refresh(&db).execute(&out.refresh_token).await.unwrap();
        assert!(db.session(sid).unwrap().revoked_at.is_none());
    }

    #[tokio::test]
    async fn replaying_an_old_token_revokes_the_session() {
        let db = MemoryDb::default();
        let (sid, token) = logged_in(&db).await;
        let rotated = refresh(&db).execute(&token).await.unwrap();

        let err = refresh(&db).execute(&token).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SessionInvalid);
        assert!(db.session(sid).unwrap().revoked_at.is_some());

        // the legitimate holder is locked out as well
        let err = refresh(&db).execute(&rotated.refresh_token).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SessionInvalid);
    }

    #[tokio::test]
    async fn expired_session_reports_expiry() {
        let db = MemoryDb::default();
        let (sid, token) = logged_in(&db).await;
        db.expire_session(sid);
        let err = refresh(&db).execute(&token).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SessionExpired);
    }

    #[tokio::test]
    async fn malformed_token_is_invalid() {
        let db = MemoryDb::default();
        let err = refresh(&db).execute("nope").await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SessionInvalid);
    }
}

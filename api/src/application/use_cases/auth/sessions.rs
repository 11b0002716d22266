use chrono::Utc;
use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::session_repository::SessionRepository;
use crate::domain::auth::session::Session;

pub struct ListSessions<'a, S: SessionRepository + ?Sized> {
    pub sessions: &'a S,
}

impl<'a, S: SessionRepository + ?Sized> ListSessions<'a, S> {
    /// Active sessions first, newest first within each group.
    pub async fn execute(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions = self.sessions.list_for_user(user_id).await?;
        sessions.sort_by(|a, b| {
            b.is_active_at(now)
                .cmp(&a.is_active_at(now))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(sessions)
    }
}

pub struct RevokeSession<'a, S: SessionRepository + ?Sized> {
    pub sessions: &'a S,
}

impl<'a, S: SessionRepository + ?Sized> RevokeSession<'a, S> {
    pub async fn execute(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        match self.sessions.find_by_id(session_id).await? {
            Some(s) if s.user_id == user_id => {
                self.sessions.revoke(session_id).await?;
                Ok(())
            }
            _ => Err(AppError::with_message(ErrorCode::NotFound, "session not found")),
        }
    }
}

/// Removes sessions whose refresh window closed before `retention` ago.
pub struct PurgeExpiredSessions<'a, S: SessionRepository + ?Sized> {
    pub sessions: &'a S,
    pub retention: chrono::Duration,
}

impl<'a, S: SessionRepository + ?Sized> PurgeExpiredSessions<'a, S> {
    pub async fn execute(&self) -> anyhow::Result<u64> {
        let purged = self
            .sessions
            .purge_expired(Utc::now() - self.retention)
            .await?;
        if purged > 0 {
            tracing::info!(purged, "expired_sessions_purged");
        }
        Ok(purged)
    }
}

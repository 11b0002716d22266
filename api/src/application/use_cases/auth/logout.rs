use crate::application::access::Principal;
use crate::application::errors::AppResult;
use crate::application::ports::session_repository::SessionRepository;

pub struct Logout<'a, S: SessionRepository + ?Sized> {
    pub sessions: &'a S,
}

impl<'a, S: SessionRepository + ?Sized> Logout<'a, S> {
    /// API-key callers have no session; logging them out is a no-op.
    pub async fn execute(&self, principal: &Principal) -> AppResult<()> {
        if let Some(session_id) = principal.session_id() {
            let revoked = self.sessions.revoke(session_id).await?;
            tracing::debug!(%session_id, revoked, "session_logout");
        }
        Ok(())
    }
}

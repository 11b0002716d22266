use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::access::Principal;
use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::NotificationSignal;
use crate::application::ports::session_repository::SessionRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications;
use crate::application::services::passwords::{hash_password, verify_password};
use crate::domain::notifications::notification::{Channel, NewNotification};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub new_password: String,
}

/// Replaces the caller's password and signs out every other session.
pub struct ChangePassword<'a, U, S, N, G>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    G: NotificationSignal + ?Sized,
{
    pub users: &'a U,
    pub sessions: &'a S,
    pub notifications: &'a N,
    pub signal: &'a G,
}

impl<'a, U, S, N, G> ChangePassword<'a, U, S, N, G>
where
    U: UserRepository + ?Sized,
    S: SessionRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    G: NotificationSignal + ?Sized,
{
    pub async fn execute(&self, principal: &Principal, req: &ChangePasswordRequest) -> AppResult<u64> {
        req.validate()?;
        let creds = self
            .users
            .find_credentials_by_id(principal.user_id)
            .await?
            .ok_or_else(|| AppError::code(ErrorCode::UserNotFound))?;
        if !verify_password(&creds.password_hash, &req.current_password) {
            return Err(AppError::with_message(
                ErrorCode::InvalidCredentials,
                "current password is incorrect",
            ));
        }
        let hash = hash_password(&req.new_password)?;
        self.users.update_password(creds.id, &hash).await?;
        let revoked = self
            .sessions
            .revoke_for_user(creds.id, principal.session_id())
            .await?;

        notifications::enqueue_best_effort(
            self.notifications,
            self.signal,
            NewNotification {
                user_id: creds.id,
                channel: Channel::Email,
                title: "Your password was changed".into(),
                body: "If this wasn't you, contact an administrator right away.".into(),
                data: serde_json::json!({ "template": "password_changed" }),
            },
        )
        .await;

        tracing::info!(user_id = %creds.id, revoked_sessions = revoked, "password_changed");
        Ok(revoked)
    }
}

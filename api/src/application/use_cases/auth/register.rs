use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::NotificationSignal;
use crate::application::ports::role_repository::RoleRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications;
use crate::application::services::passwords::hash_password;
use crate::application::use_cases::auth::normalize_email;
use crate::domain::notifications::notification::{Channel, NewNotification};
use crate::domain::users::user::User;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

pub struct Register<'a, U, R, N, S>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    pub users: &'a U,
    pub roles: &'a R,
    pub notifications: &'a N,
    pub signal: &'a S,
    pub default_role: &'a str,
}

impl<'a, U, R, N, S> Register<'a, U, R, N, S>
where
    U: UserRepository + ?Sized,
    R: RoleRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    pub async fn execute(&self, req: &RegisterRequest) -> AppResult<User> {
        // trim before validating so padded input is accepted
        let req = RegisterRequest {
            email: normalize_email(&req.email),
            ..req.clone()
        };
        req.validate()?;
        let email = req.email.clone();
        if self.users.email_exists(&email).await? {
            return Err(AppError::code(ErrorCode::EmailTaken));
        }
        let hash = hash_password(&req.password)?;
        let user = self
            .users
            .create_user(&email, req.name.trim(), &hash)
            .await?;

        match self.roles.find_by_name(self.default_role).await? {
            Some(role) => self.users.set_roles(user.id, &[role.id]).await?,
            None => {
                tracing::warn!(role = self.default_role, "default_role_missing");
            }
        }

        notifications::enqueue_best_effort(
            self.notifications,
            self.signal,
            NewNotification {
                user_id: user.id,
                channel: Channel::Email,
                title: "Welcome".into(),
                body: format!("Hi {}, your account is ready.", user.name),
                data: serde_json::json!({ "template": "welcome" }),
            },
        )
        .await;

        tracing::info!(user_id = %user.id, "user_registered");
        let user = self.users.find_by_id(user.id).await?.unwrap_or(user);
        Ok(user)
    }
}

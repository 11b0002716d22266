use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::NotificationSignal;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications;
use crate::domain::notifications::notification::{Channel, NewNotification, Notification};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendNotificationRequest {
    pub user_id: Uuid,
    pub channel: Channel,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

pub struct SendNotification<'a, U, N, S>
where
    U: UserRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    pub users: &'a U,
    pub notifications: &'a N,
    pub signal: &'a S,
}

impl<'a, U, N, S> SendNotification<'a, U, N, S>
where
    U: UserRepository + ?Sized,
    N: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    pub async fn execute(&self, req: &SendNotificationRequest) -> AppResult<Notification> {
        req.validate()?;
        if self.users.find_by_id(req.user_id).await?.is_none() {
            return Err(AppError::code(ErrorCode::UserNotFound));
        }
        let data = if req.data.is_null() {
            serde_json::json!({})
        } else {
            req.data.clone()
        };
        let stored = notifications::enqueue(
            self.notifications,
            self.signal,
            NewNotification {
                user_id: req.user_id,
                channel: req.channel,
                title: req.title.clone(),
                body: req.body.clone(),
                data,
            },
        )
        .await?;
        Ok(stored)
    }
}

use serde::Deserialize;
use utoipa::ToSchema;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::services::secrets::constant_time_eq;
use crate::domain::notifications::notification::DeliveryStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeliveryCallback {
    pub external_id: String,
    pub status: ProviderStatus,
    pub error: Option<String>,
}

/// Applies a provider's delivery report to the matching outbox row.
pub struct HandleDeliveryCallback<'a, N: NotificationRepository + ?Sized> {
    pub notifications: &'a N,
    /// Callbacks are refused outright when no secret is configured.
    pub secret: Option<&'a str>,
}

impl<'a, N: NotificationRepository + ?Sized> HandleDeliveryCallback<'a, N> {
    pub async fn execute(
        &self,
        provider: &str,
        presented_secret: Option<&str>,
        callback: &DeliveryCallback,
    ) -> AppResult<()> {
        let authorized = match (self.secret, presented_secret) {
            (Some(expected), Some(given)) => constant_time_eq(expected, given),
            _ => false,
        };
        if !authorized {
            tracing::warn!(%provider, "notification_webhook_unauthorized");
            return Err(AppError::code(ErrorCode::WebhookUnauthorized));
        }
        let status = match callback.status {
            ProviderStatus::Delivered => DeliveryStatus::Sent,
            ProviderStatus::Failed => DeliveryStatus::Failed,
        };
        let updated = self
            .notifications
            .update_by_external_id(&callback.external_id, status, callback.error.as_deref())
            .await?;
        if !updated {
            return Err(AppError::code(ErrorCode::NotificationNotFound));
        }
        tracing::info!(%provider, external_id = %callback.external_id, status = status.as_str(), "notification_delivery_reported");
        Ok(())
    }
}

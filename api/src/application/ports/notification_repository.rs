use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::notifications::notification::{DeliveryStatus, NewNotification, Notification};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn enqueue(
        &self,
        notification: NewNotification,
        status: DeliveryStatus,
    ) -> anyhow::Result<Notification>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> anyhow::Result<Page<Notification>>;
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> anyhow::Result<u64>;
    /// Moves up to `limit` pending rows (and `processing` rows stuck since before
    /// `stale_before`) to `processing`, bumping their attempt counter.
    async fn claim_pending(
        &self,
        limit: i64,
        stale_before: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Notification>>;
    async fn mark_sent(&self, id: Uuid, external_id: Option<&str>) -> anyhow::Result<()>;
    async fn mark_failure(
        &self,
        id: Uuid,
        error: &str,
        status: DeliveryStatus,
    ) -> anyhow::Result<()>;
    async fn update_by_external_id(
        &self,
        external_id: &str,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> anyhow::Result<bool>;
}

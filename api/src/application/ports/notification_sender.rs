use async_trait::async_trait;

use crate::domain::notifications::notification::{Channel, Notification};

#[derive(Debug, Clone)]
pub struct Recipient {
    pub name: String,
    /// email address, phone number or device token depending on the channel
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    pub external_id: Option<String>,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn supports(&self, channel: Channel) -> bool;
    async fn send(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> anyhow::Result<DeliveryReceipt>;
}

/// Wakes the dispatcher and fans in-app notifications out to live subscribers.
pub trait NotificationSignal: Send + Sync {
    fn enqueued(&self, notification: &Notification);
}

use async_trait::async_trait;

use crate::application::ports::notification_sender::{
    DeliveryReceipt, NotificationSender, Recipient,
};
use crate::domain::notifications::notification::{Channel, Notification};

/// Development sender: writes the delivery to the log and reports success.
pub struct LogNotificationSender {
    channels: Vec<Channel>,
}

impl LogNotificationSender {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl NotificationSender for LogNotificationSender {
    fn supports(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }

    async fn send(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> anyhow::Result<DeliveryReceipt> {
        tracing::info!(
            notification_id = %notification.id,
            channel = %notification.channel,
            to = %recipient.address,
            title = %notification.title,
            "notification_logged"
        );
        Ok(DeliveryReceipt::default())
    }
}

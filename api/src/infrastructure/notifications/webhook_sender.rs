use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::notification_sender::{
    DeliveryReceipt, NotificationSender, Recipient,
};
use crate::domain::notifications::notification::{Channel, Notification};

#[derive(Debug, Deserialize)]
struct ProviderAck {
    id: Option<serde_json::Value>,
}

/// Hands a notification to an HTTP provider for one channel.
pub struct WebhookNotificationSender {
    client: reqwest::Client,
    channel: Channel,
    url: String,
}

impl WebhookNotificationSender {
    pub fn new(channel: Channel, url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            channel,
            url: url.into(),
        }
    }
}

fn payload(notification: &Notification, recipient: &Recipient) -> serde_json::Value {
    serde_json::json!({
        "id": notification.id,
        "channel": notification.channel,
        "to": recipient.address,
        "name": recipient.name,
        "title": notification.title,
        "body": notification.body,
        "data": notification.data,
    })
}

fn external_id(ack: ProviderAck) -> Option<String> {
    match ack.id? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl NotificationSender for WebhookNotificationSender {
    fn supports(&self, channel: Channel) -> bool {
        channel == self.channel
    }

    async fn send(
        &self,
        notification: &Notification,
        recipient: &Recipient,
    ) -> anyhow::Result<DeliveryReceipt> {
        let resp = self
            .client
            .post(&self.url)
            .json(&payload(notification, recipient))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("provider returned status {}", resp.status());
        }
        // providers without a JSON body still count as accepted
        let ack = resp
            .json::<ProviderAck>()
            .await
            .unwrap_or(ProviderAck { id: None });
        Ok(DeliveryReceipt {
            external_id: external_id(ack),
        })
    }
}

use std::sync::Arc;

use tokio::sync::{Notify, broadcast};

use crate::application::ports::notification_sender::NotificationSignal;
use crate::domain::notifications::notification::Notification;

/// Wakes the dispatcher for queued deliveries and publishes in-app
/// notifications to SSE subscribers.
#[derive(Clone)]
pub struct BroadcastNotificationSignal {
    wake: Arc<Notify>,
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotificationSignal {
    pub fn new(wake: Arc<Notify>, sender: broadcast::Sender<Notification>) -> Self {
        Self { wake, sender }
    }
}

impl NotificationSignal for BroadcastNotificationSignal {
    fn enqueued(&self, notification: &Notification) {
        if notification.channel.is_stored_only() {
            // no subscribers is fine
            let _ = self.sender.send(notification.clone());
        } else {
            self.wake.notify_one();
        }
    }
}

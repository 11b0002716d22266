use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};

use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::{
    DeliveryReceipt, NotificationSender, Recipient,
};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::notifications::notification::{Channel, DeliveryStatus, Notification};

#[derive(Debug, Clone, Copy)]
pub struct DispatcherSettings {
    pub batch_size: i64,
    pub max_attempts: i32,
    pub poll_interval: Duration,
    /// Rows left in `processing` for longer than this are claimed again.
    pub stale_after: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_attempts: 5,
            poll_interval: Duration::from_secs(10),
            stale_after: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub claimed: usize,
    pub sent: usize,
    pub retrying: usize,
    pub failed: usize,
}

/// Drains the notification outbox through the configured senders.
pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
    senders: Vec<Arc<dyn NotificationSender>>,
    wake: Arc<Notify>,
    settings: DispatcherSettings,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
        senders: Vec<Arc<dyn NotificationSender>>,
        wake: Arc<Notify>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            repo,
            users,
            senders,
            wake,
            settings,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            batch_size = self.settings.batch_size,
            max_attempts = self.settings.max_attempts,
            "notification_dispatcher_started"
        );
        loop {
            // keep draining while full batches go out cleanly; failed rows
            // wait for the next poll
            loop {
                if *shutdown.borrow() {
                    tracing::info!("notification_dispatcher_stopped");
                    return;
                }
                match self.run_once().await {
                    Ok(stats)
                        if stats.claimed as i64 >= self.settings.batch_size
                            && stats.retrying == 0 =>
                    {
                        continue;
                    }
                    Ok(_) => break,
                    Err(err) => {
                        tracing::error!(error = ?err, "notification_dispatch_cycle_failed");
                        break;
                    }
                }
            }
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = shutdown.changed() => {
                    tracing::info!("notification_dispatcher_stopped");
                    return;
                }
            }
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<DispatchStats> {
        let stale_before = chrono::Utc::now()
            - chrono::Duration::from_std(self.settings.stale_after)
                .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let batch = self
            .repo
            .claim_pending(self.settings.batch_size, stale_before)
            .await?;
        let mut stats = DispatchStats {
            claimed: batch.len(),
            ..Default::default()
        };
        for notification in batch {
            match self.deliver(&notification).await {
                Ok(receipt) => {
                    self.repo
                        .mark_sent(notification.id, receipt.external_id.as_deref())
                        .await?;
                    tracing::debug!(notification_id = %notification.id, channel = %notification.channel, "notification_sent");
                    stats.sent += 1;
                }
                Err(err) => {
                    let status = DeliveryStatus::after_failure(
                        notification.attempts,
                        self.settings.max_attempts,
                    );
                    tracing::warn!(
                        notification_id = %notification.id,
                        channel = %notification.channel,
                        attempts = notification.attempts,
                        error = ?err,
                        "notification_dispatch_failed"
                    );
                    self.repo
                        .mark_failure(notification.id, &err.to_string(), status)
                        .await?;
                    if status == DeliveryStatus::Failed {
                        stats.failed += 1;
                    } else {
                        stats.retrying += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    async fn deliver(&self, notification: &Notification) -> anyhow::Result<DeliveryReceipt> {
        if notification.channel.is_stored_only() {
            return Ok(DeliveryReceipt::default());
        }
        let sender = self
            .senders
            .iter()
            .find(|s| s.supports(notification.channel))
            .ok_or_else(|| anyhow::anyhow!("no sender for channel {}", notification.channel))?;
        let user = self
            .users
            .find_by_id(notification.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("recipient user not found"))?;
        let recipient = recipient_for(notification, &user.name, &user.email)
            .ok_or_else(|| anyhow::anyhow!("no recipient address"))?;
        sender.send(notification, &recipient).await
    }
}

/// Email goes to the account address; SMS and push need `data.to`.
fn recipient_for(notification: &Notification, name: &str, email: &str) -> Option<Recipient> {
    let address = match notification.channel {
        Channel::Email => Some(email.to_string()),
        Channel::Sms | Channel::Push => notification
            .data
            .get("to")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        Channel::InApp => None,
    }?;
    Some(Recipient {
        name: name.to_string(),
        address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::notification_repository::NotificationRepository;
    use crate::application::ports::user_repository::UserRepository;
    use crate::application::testing::{MemoryDb, ScriptedSender};
    use crate::domain::notifications::notification::NewNotification;

    async fn setup(
        sender: ScriptedSender,
        max_attempts: i32,
    ) -> (Arc<MemoryDb>, Arc<ScriptedSender>, NotificationDispatcher, uuid::Uuid) {
        let db = Arc::new(MemoryDb::default());
        let user = UserRepository::create_user(db.as_ref(), "ada@example.com", "Ada", "hash")
            .await
            .unwrap();
        let sender = Arc::new(sender);
        let dispatcher = NotificationDispatcher::new(
            db.clone(),
            db.clone(),
            vec![sender.clone()],
            Arc::new(Notify::new()),
            DispatcherSettings {
                max_attempts,
                ..Default::default()
            },
        );
        (db, sender, dispatcher, user.id)
    }

    fn email(user_id: uuid::Uuid) -> NewNotification {
        NewNotification {
            user_id,
            channel: Channel::Email,
            title: "Welcome".into(),
            body: "Hello".into(),
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn delivers_pending_email_to_account_address() {
        let (db, sender, dispatcher, user_id) = setup(ScriptedSender::ok(), 3).await;
        let n = db.enqueue(email(user_id), DeliveryStatus::Pending).await.unwrap();

        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats, DispatchStats { claimed: 1, sent: 1, retrying: 0, failed: 0 });
        assert_eq!(sender.sent(), vec![(n.id, "ada@example.com".to_string())]);
        let stored = db.notification(n.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::Sent);
        assert!(stored.external_id.is_some());

        // nothing left to claim
        assert_eq!(dispatcher.run_once().await.unwrap().claimed, 0);
    }

    #[tokio::test]
    async fn failures_retry_until_attempts_are_exhausted() {
        let (db, _sender, dispatcher, user_id) = setup(ScriptedSender::failing(), 2).await;
        let n = db.enqueue(email(user_id), DeliveryStatus::Pending).await.unwrap();

        let first = dispatcher.run_once().await.unwrap();
        assert_eq!(first.retrying, 1);
        assert_eq!(db.notification(n.id).unwrap().status, DeliveryStatus::Pending);

        let second = dispatcher.run_once().await.unwrap();
        assert_eq!(second.failed, 1);
        let stored = db.notification(n.id).unwrap();
        assert_eq!(stored.status, DeliveryStatus::Failed);
        assert_eq!(stored.attempts, 2);
        assert!(stored.last_error.is_some());
    }

    #[tokio::test]
    async fn run_leaves_retries_for_the_next_poll() {
        let db = Arc::new(MemoryDb::default());
        let user = UserRepository::create_user(db.as_ref(), "ada@example.com", "Ada", "hash")
            .await
            .unwrap();
        let dispatcher = NotificationDispatcher::new(
            db.clone(),
            db.clone(),
            vec![Arc::new(ScriptedSender::failing())],
            Arc::new(Notify::new()),
            DispatcherSettings {
                batch_size: 1,
                max_attempts: 5,
                poll_interval: Duration::from_secs(3600),
                ..Default::default()
            },
        );
        let n = db.enqueue(email(user.id), DeliveryStatus::Pending).await.unwrap();

        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(dispatcher.run(shutdown));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let stored = db.notification(n.id).unwrap();
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.status, DeliveryStatus::Pending);

        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher stops on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn sms_without_phone_number_fails() {
        let (db, sender, dispatcher, user_id) = setup(ScriptedSender::ok(), 1).await;
        let mut sms = email(user_id);
        sms.channel = Channel::Sms;
        let n = db.enqueue(sms, DeliveryStatus::Pending).await.unwrap();

        let stats = dispatcher.run_once().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert!(sender.sent().is_empty());
        assert_eq!(
            db.notification(n.id).unwrap().last_error.as_deref(),
            Some("no recipient address")
        );
    }

    #[tokio::test]
    async fn sms_uses_data_to() {
        let (db, sender, dispatcher, user_id) = setup(ScriptedSender::ok(), 1).await;
        let mut sms = email(user_id);
        sms.channel = Channel::Sms;
        sms.data = serde_json::json!({"to": "+15550100"});
        let n = db.enqueue(sms, DeliveryStatus::Pending).await.unwrap();

        dispatcher.run_once().await.unwrap();
        assert_eq!(sender.sent(), vec![(n.id, "+15550100".to_string())]);
    }
}

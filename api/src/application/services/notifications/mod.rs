mod dispatcher;

pub use dispatcher::{DispatchStats, DispatcherSettings, NotificationDispatcher};

use crate::application::ports::notification_repository::NotificationRepository;
use crate::application::ports::notification_sender::NotificationSignal;
use crate::domain::notifications::notification::{DeliveryStatus, NewNotification, Notification};

/// Writes the outbox row and pokes the dispatcher. In-app notifications need no
/// delivery and are stored as sent.
pub async fn enqueue<R, S>(
    repo: &R,
    signal: &S,
    notification: NewNotification,
) -> anyhow::Result<Notification>
where
    R: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    let status = if notification.channel.is_stored_only() {
        DeliveryStatus::Sent
    } else {
        DeliveryStatus::Pending
    };
    let stored = repo.enqueue(notification, status).await?;
    signal.enqueued(&stored);
    Ok(stored)
}

/// Fire-and-forget variant for side notifications of account operations.
pub async fn enqueue_best_effort<R, S>(repo: &R, signal: &S, notification: NewNotification)
where
    R: NotificationRepository + ?Sized,
    S: NotificationSignal + ?Sized,
{
    let user_id = notification.user_id;
    let channel = notification.channel;
    if let Err(err) = enqueue(repo, signal, notification).await {
        tracing::warn!(error = ?err, %user_id, %channel, "notification_enqueue_failed");
    }
}

use uuid::Uuid;

use crate::application::errors::{AppError, AppResult, ErrorCode};
use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::notification_repository::NotificationRepository;
use crate::domain::notifications::notification::Notification;

/// The caller's in-app notifications.
pub struct Inbox<'a, N: NotificationRepository + ?Sized> {
    pub notifications: &'a N,
}

impl<'a, N: NotificationRepository + ?Sized> Inbox<'a, N> {
    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<Page<Notification>> {
        Ok(self
            .notifications
            .list_for_user(user_id, unread_only, page)
            .await?)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        if !self.notifications.mark_read(id, user_id).await? {
            return Err(AppError::code(ErrorCode::NotificationNotFound));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryDb;
    use crate::domain::notifications::notification::{Channel, DeliveryStatus, NewNotification};

    async fn push(db: &MemoryDb, user_id: Uuid, channel: Channel) -> Notification {
        db.enqueue(
            NewNotification {
                user_id,
                channel,
                title: "t".into(),
                body: "b".into(),
                data: serde_json::json!({}),
            },
            DeliveryStatus::Sent,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn unread_filter_and_ownership() {
        let db = MemoryDb::default();
        let me = Uuid::new_v4();
        let a = push(&db, me, Channel::InApp).await;
        push(&db, me, Channel::InApp).await;
        push(&db, me, Channel::Email).await;
        let theirs = push(&db, Uuid::new_v4(), Channel::InApp).await;
        let inbox = Inbox { notifications: &db };

        assert_eq!(inbox.list(me, false, PageRequest::default()).await.unwrap().total, 2);
        inbox.mark_read(me, a.id).await.unwrap();
        assert_eq!(inbox.list(me, true, PageRequest::default()).await.unwrap().total, 1);

        let err = inbox.mark_read(me, theirs.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NotificationNotFound);

        assert_eq!(inbox.mark_all_read(me).await.unwrap(), 1);
        assert_eq!(inbox.list(me, true, PageRequest::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn outbound_channels_are_not_in_the_inbox() {
        let db = MemoryDb::default();
        let me = Uuid::new_v4();
        let email = push(&db, me, Channel::Email).await;
        let inbox = Inbox { notifications: &db };

        let err = inbox.mark_read(me, email.id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::NotificationNotFound);
        assert_eq!(inbox.mark_all_read(me).await.unwrap(), 0);
    }
}

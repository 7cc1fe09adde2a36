//! Per-user push fan-out
//!
//! Each user gets a lazily created broadcast channel; every live stream for
//! that user subscribes to it. Delivery is lossy: a slow consumer that
//! overflows the channel drops the oldest events rather than holding up
//! the sender.

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::constants::PUSH_CHANNEL_CAPACITY;
use crate::data::types::Notification;

#[derive(Debug, Default)]
pub struct PushService {
    channels: DashMap<Uuid, broadcast::Sender<Notification>>,
}

impl PushService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a user's notifications, creating the channel on demand
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<Notification> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(PUSH_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push a notification to a user. A user with no live streams is not
    /// an error; the event is simply dropped.
    pub fn send(&self, user_id: Uuid, notification: Notification) {
        let Some(sender) = self.channels.get(&user_id) else {
            tracing::trace!(%user_id, "no live streams, dropping notification");
            return;
        };
        match sender.send(notification) {
            Ok(receivers) => {
                tracing::trace!(%user_id, receivers, "notification delivered");
            }
            Err(_) => {
                tracing::trace!(%user_id, "all streams gone, dropping notification");
            }
        }
    }

    /// Drop channels with no remaining subscribers
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::NotificationKind;

    fn notification(chat_id: Uuid) -> Notification {
        Notification {
            kind: NotificationKind::NewMessage,
            chat_id,
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            chat_name: None,
            content: Some("hi".to_string()),
            message_kind: None,
            media: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_their_own_events_only() {
        let push = PushService::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut alice_rx = push.subscribe(alice);
        let mut bob_rx = push.subscribe(bob);

        let chat_id = Uuid::new_v4();
        push.send(alice, notification(chat_id));

        assert_eq!(alice_rx.recv().await.unwrap().chat_id, chat_id);
        assert!(matches!(
            bob_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn sending_without_subscribers_does_not_panic() {
        let push = PushService::new();
        push.send(Uuid::new_v4(), notification(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn all_streams_of_one_user_see_the_event() {
        let push = PushService::new();
        let alice = Uuid::new_v4();
        let mut rx1 = push.subscribe(alice);
        let mut rx2 = push.subscribe(alice);

        push.send(alice, notification(Uuid::new_v4()));
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn prune_drops_dead_channels() {
        let push = PushService::new();
        let alice = Uuid::new_v4();
        drop(push.subscribe(alice));
        push.prune();
        assert!(push.channels.is_empty());
    }
}

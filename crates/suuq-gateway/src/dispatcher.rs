use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use suuq_types::events::GatewayEvent;

/// Routes per-user events to every open connection of that user.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// One open socket and the login session it identified with.
struct Channel {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id -> channel). A user may have several tabs open.
    user_channels: RwLock<HashMap<Uuid, HashMap<Uuid, Channel>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id` opened under `session_id`.
    /// Returns (conn_id, receiver).
    pub async fn register(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, Channel { session_id, tx });
        (conn_id, rx)
    }

    /// Drop one connection. The user entry goes away with its last connection.
    pub async fn unregister(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some(conns) = channels.get_mut(&user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                channels.remove(&user_id);
            }
        }
    }

    /// Drop every connection opened under a session, as on logout. Their
    /// receivers close, which ends the socket. Returns how many were dropped.
    pub async fn close_session(&self, user_id: Uuid, session_id: Uuid) -> usize {
        let mut channels = self.inner.user_channels.write().await;
        let Some(conns) = channels.get_mut(&user_id) else {
            return 0;
        };
        let before = conns.len();
        conns.retain(|_, channel| channel.session_id != session_id);
        let closed = before - conns.len();
        if conns.is_empty() {
            channels.remove(&user_id);
        }
        closed
    }

    /// Send an event to all of a user's connections. Returns how many
    /// connections accepted it; zero when the user is offline.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> usize {
        let channels = self.inner.user_channels.read().await;
        let Some(conns) = channels.get(&user_id) else {
            return 0;
        };
        conns
            .values()
            .filter(|channel| channel.tx.send(event.clone()).is_ok())
            .count()
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .user_channels
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    pub async fn online_users(&self) -> usize {
        self.inner.user_channels.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use suuq_types::models::{Notification, NotificationKind};

    fn notification(user_id: Uuid) -> GatewayEvent {
        GatewayEvent::NotificationCreate {
            notification: Notification {
                id: Uuid::new_v4(),
                user_id,
                title: "Xayeysiis la ansixiyay".into(),
                message: "Your ad is live".into(),
                kind: NotificationKind::AdApproved,
                read: false,
                related_id: None,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn delivers_to_every_tab() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (_, mut first) = dispatcher.register(user, Uuid::new_v4()).await;
        let (_, mut second) = dispatcher.register(user, Uuid::new_v4()).await;

        assert_eq!(dispatcher.send_to_user(user, notification(user)).await, 2);
        assert!(matches!(first.recv().await, Some(GatewayEvent::NotificationCreate { .. })));
        assert!(matches!(second.recv().await, Some(GatewayEvent::NotificationCreate { .. })));
    }

    #[tokio::test]
    async fn other_users_and_closed_tabs_get_nothing() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let (conn_a, _rx_a) = dispatcher.register(user, Uuid::new_v4()).await;
        let (_, mut rx_stranger) = dispatcher.register(stranger, Uuid::new_v4()).await;

        dispatcher.send_to_user(user, notification(user)).await;
        assert!(rx_stranger.try_recv().is_err());

        dispatcher.unregister(user, conn_a).await;
        assert_eq!(dispatcher.connection_count(user).await, 0);
        assert_eq!(dispatcher.online_users().await, 1);
        assert_eq!(dispatcher.send_to_user(user, notification(user)).await, 0);
    }

    #[tokio::test]
    async fn closing_a_session_ends_only_its_sockets() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (phone, laptop) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut on_phone) = dispatcher.register(user, phone).await;
        let (_, mut on_laptop) = dispatcher.register(user, laptop).await;

        assert_eq!(dispatcher.close_session(user, phone).await, 1);
        assert!(on_phone.recv().await.is_none());
        assert_eq!(dispatcher.connection_count(user).await, 1);

        assert_eq!(dispatcher.send_to_user(user, notification(user)).await, 1);
        assert!(on_laptop.recv().await.is_some());

        assert_eq!(dispatcher.close_session(user, laptop).await, 1);
        assert_eq!(dispatcher.online_users().await, 0);
    }
}

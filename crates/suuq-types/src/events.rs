use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification};

/// Per-user realtime streams a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feed {
    Notifications,
    Messages,
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, email: String },

    /// A notification row was inserted for this user
    NotificationCreate { notification: Notification },

    /// A message this user sent or received was inserted
    MessageCreate { message: Message },
}

impl GatewayEvent {
    /// The feed this event belongs to. `Ready` is always delivered.
    pub fn feed(&self) -> Option<Feed> {
        match self {
            Self::NotificationCreate { .. } => Some(Feed::Notifications),
            Self::MessageCreate { .. } => Some(Feed::Messages),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace the set of feeds forwarded to this connection.
    Subscribe { feeds: Vec<Feed> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"Subscribe","data":{"feeds":["notifications","messages"]}}"#,
        )
        .unwrap();
        match cmd {
            GatewayCommand::Subscribe { feeds } => {
                assert_eq!(feeds, vec![Feed::Notifications, Feed::Messages]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

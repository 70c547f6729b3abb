use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use suuq_db::Database;
use suuq_types::api::Claims;
use suuq_types::events::{Feed, GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a fresh socket has to send Identify.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type Feeds = Arc<RwLock<HashSet<Feed>>>;

/// Handle one WebSocket connection: Identify, Ready, then relay the user's
/// events for whichever feeds the client subscribed to.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(claims) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    if !session_is_active(&db, &claims).await {
        warn!("{} ({}) identified with a revoked session", claims.email, claims.sub);
        return;
    }

    let user_id = claims.sub;
    let session_id = claims.sid;
    let email = claims.email;

    let ready = GatewayEvent::Ready {
        user_id,
        email: email.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher, user_id, session_id, &email).await;
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    user_id: Uuid,
    session_id: Uuid,
    email: &str,
) {
    let (conn_id, mut user_rx) = dispatcher.register(user_id, session_id).await;
    info!(
        "{} ({}) connected to gateway, {} user(s) online",
        email,
        user_id,
        dispatcher.online_users().await
    );

    // Nothing is forwarded until the client subscribes.
    let feeds: Feeds = Arc::new(RwLock::new(HashSet::new()));
    let send_feeds = feeds.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = user_rx.recv() => {
                    let Some(event) = event else { break };
                    if !is_subscribed(&send_feeds, &event) {
                        continue;
                    }
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let email_recv = email.to_string();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(user_id, &email_recv, cmd, &feeds),
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            email_recv,
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister(user_id, conn_id).await;
    info!(
        "{} ({}) disconnected from gateway, {} connection(s) left",
        email,
        user_id,
        dispatcher.connection_count(user_id).await
    );
}

fn handle_command(user_id: Uuid, email: &str, cmd: GatewayCommand, feeds: &Feeds) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { feeds: requested } => {
            debug!("{} ({}) subscribing to {:?}", email, user_id, requested);
            let mut subs = feeds.write().unwrap_or_else(|e| e.into_inner());
            *subs = requested.into_iter().collect();
        }
    }
}

fn is_subscribed(feeds: &Feeds, event: &GatewayEvent) -> bool {
    match event.feed() {
        Some(feed) => feeds
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&feed),
        None => true,
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            Ok(())
        }
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return decode_token(&token, jwt_secret);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify)
        .await
        .ok()
        .flatten()
}

fn decode_token(token: &str, jwt_secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

async fn session_is_active(db: &Arc<Database>, claims: &Claims) -> bool {
    let db = db.clone();
    let (sid, user_id) = (claims.sid, claims.sub);
    match tokio::task::spawn_blocking(move || db.session_is_active(sid, user_id)).await {
        Ok(Ok(active)) => active,
        Ok(Err(e)) => {
            warn!("Session lookup failed: {}", e);
            false
        }
        Err(e) => {
            warn!("Session lookup task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use suuq_types::models::Message as ChatMessage;

    fn token(secret: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "gw@example.so".into(),
            sid: Uuid::new_v4(),
            exp: (Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn identify_token_must_match_secret() {
        assert!(decode_token(&token("secret", 3600), "secret").is_some());
        assert!(decode_token(&token("secret", 3600), "other").is_none());
        assert!(decode_token(&token("secret", -3600), "secret").is_none());
    }

    #[test]
    fn feed_filter() {
        let feeds: Feeds = Arc::new(RwLock::new(HashSet::new()));
        let message = GatewayEvent::MessageCreate {
            message: ChatMessage {
                id: Uuid::new_v4(),
                sender_id: Uuid::new_v4(),
                receiver_id: Uuid::new_v4(),
                ad_id: Uuid::new_v4(),
                message: "Salaan".into(),
                created_at: Utc::now(),
            },
        };
        let ready = GatewayEvent::Ready { user_id: Uuid::new_v4(), email: "r@example.so".into() };

        assert!(!is_subscribed(&feeds, &message));
        assert!(is_subscribed(&feeds, &ready));

        handle_command(
            Uuid::new_v4(),
            "gw@example.so",
            GatewayCommand::Subscribe { feeds: vec![Feed::Messages] },
            &feeds,
        );
        assert!(is_subscribed(&feeds, &message));
    }
}

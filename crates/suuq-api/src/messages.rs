use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use suuq_db::models::ConversationRow;
use suuq_types::api::{Claims, Conversation, ConversationThread, SendMessageRequest};
use suuq_types::events::GatewayEvent;
use suuq_types::i18n::Text;
use suuq_types::models::{NotificationKind, display_name};

use crate::error::ApiError;
use crate::state::AppState;

/// Longest message body shown in a notification.
const PREVIEW_CHARS: usize = 80;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.message.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::validation(
            "Fariinta ma noqon karto mid madhan",
            "Message cannot be empty",
        ));
    }

    let ad_id = req.ad_id;
    let ad = state
        .db(move |db| db.get_ad(ad_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    let sender_id = claims.sub;
    let receiver_id = req.receiver_id.unwrap_or(ad.user_id);
    if receiver_id == sender_id {
        return Err(ApiError::validation(
            "Naftaada fariin uma diri kartid",
            "You cannot message yourself",
        ));
    }
    // Every conversation is between the ad owner and one other user.
    if sender_id != ad.user_id && receiver_id != ad.user_id {
        return Err(ApiError::validation(
            "Fariinta waa inay tagtaa milkiilaha xayeysiiska",
            "Messages must involve the ad owner",
        ));
    }

    let message = state
        .db(move |db| {
            if db.get_user(receiver_id)?.is_none() {
                return Ok(None);
            }
            db.insert_message(sender_id, receiver_id, ad_id, &text).map(Some)
        })
        .await?
        .ok_or(ApiError::NotFound)?;

    info!("{} -> {} message on ad {}", sender_id, receiver_id, ad_id);

    for user in [sender_id, receiver_id] {
        state
            .dispatcher
            .send_to_user(user, GatewayEvent::MessageCreate { message: message.clone() })
            .await;
    }

    let preview: String = message.message.chars().take(PREVIEW_CHARS).collect();
    state
        .notify(
            receiver_id,
            NotificationKind::Message,
            Text::owned(
                format!("Fariin cusub: {}", ad.title),
                format!("New message: {}", ad.title),
            ),
            Text::owned(preview.clone(), preview),
            Some(ad_id),
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let rows = state.db(move |db| db.list_conversation_rows(user_id)).await?;
    Ok(Json(group_conversations(user_id, rows)))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((ad_id, other_user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let messages = state
        .db(move |db| db.thread(ad_id, user_id, other_user_id))
        .await?;
    Ok(Json(ConversationThread {
        ad_id,
        other_user_id,
        messages,
    }))
}

/// Fold the user's messages (newest first) into one entry per
/// (ad, counterpart). `unread_count` counts the latest run of received
/// messages, stopping at the user's own most recent reply.
pub fn group_conversations(user_id: Uuid, rows: Vec<ConversationRow>) -> Vec<Conversation> {
    let mut conversations: Vec<Conversation> = Vec::new();
    // key -> (index, still counting unread)
    let mut index: HashMap<(Uuid, Uuid), (usize, bool)> = HashMap::new();

    for row in rows {
        let msg = &row.message;
        let incoming = msg.receiver_id == user_id;
        let other = if incoming { msg.sender_id } else { msg.receiver_id };
        let key = (msg.ad_id, other);

        match index.get_mut(&key) {
            Some((i, counting)) => {
                if *counting {
                    if incoming {
                        conversations[*i].unread_count += 1;
                    } else {
                        *counting = false;
                    }
                }
            }
            None => {
                index.insert(key, (conversations.len(), incoming));
                conversations.push(Conversation {
                    ad_id: msg.ad_id,
                    other_user_id: other,
                    other_user_name: display_name(
                        other,
                        row.other_shop_name.as_deref(),
                        row.other_email.as_deref(),
                    ),
                    ad_title: row.ad_title.clone(),
                    ad_price: row.ad_price,
                    ad_currency: row.ad_currency,
                    last_message: msg.message.clone(),
                    last_message_time: msg.created_at,
                    unread_count: usize::from(incoming),
                });
            }
        }
    }

    conversations
}

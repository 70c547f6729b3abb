use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use suuq_types::api::{Claims, NotificationList};

use crate::error::ApiError;
use crate::state::AppState;

const NOTIFICATION_PAGE: u32 = 20;

/// Latest notifications with the unread count for the bell badge.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (notifications, unread) = state
        .db(move |db| {
            Ok((
                db.list_notifications(user_id, NOTIFICATION_PAGE)?,
                db.unread_count(user_id)?,
            ))
        })
        .await?;
    Ok(Json(NotificationList {
        notifications,
        unread,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    if !state.db(move |db| db.mark_read(id, user_id)).await? {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    state.db(move |db| db.mark_all_read(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

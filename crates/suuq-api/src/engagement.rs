use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use suuq_db::models::CommentRow;
use suuq_types::api::{
    Claims, CommentRequest, CommentResponse, FavoriteEntry, FavoriteToggleResponse, RateAdRequest,
};
use suuq_types::models::display_name;

use crate::ads::visible_ad;
use crate::error::ApiError;
use crate::state::AppState;

fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        author_name: display_name(row.user_id, row.shop_name.as_deref(), row.email.as_deref()),
        id: row.id,
        ad_id: row.ad_id,
        user_id: row.user_id,
        comment: row.comment,
        created_at: row.created_at,
    }
}

// -- Favorites --

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    visible_ad(&state, ad_id, Some(claims.sub)).await?;
    let user_id = claims.sub;
    let favorited = state.db(move |db| db.toggle_favorite(ad_id, user_id)).await?;
    debug!("{} favorite on {}: {}", user_id, ad_id, favorited);
    Ok(Json(FavoriteToggleResponse { favorited }))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let rows = state.db(move |db| db.list_favorites(user_id)).await?;
    let entries: Vec<FavoriteEntry> = rows
        .into_iter()
        .map(|row| FavoriteEntry {
            favorite_id: row.id,
            favorited_at: row.created_at,
            ad: row.ad,
        })
        .collect();
    Ok(Json(entries))
}

// -- Comments --

pub async fn list_comments(
    State(state): State<AppState>,
    Path(ad_id): Path<Uuid>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, ApiError> {
    visible_ad(&state, ad_id, claims.map(|Extension(c)| c.sub)).await?;
    let rows = state.db(move |db| db.list_comments(ad_id)).await?;
    let comments: Vec<CommentResponse> = rows.into_iter().map(comment_response).collect();
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.comment.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::validation(
            "Faallada ma noqon karto mid madhan",
            "Comment cannot be empty",
        ));
    }
    visible_ad(&state, ad_id, Some(claims.sub)).await?;

    let user_id = claims.sub;
    let row = state
        .db(move |db| db.insert_comment(ad_id, user_id, &text))
        .await?;
    Ok((StatusCode::CREATED, Json(comment_response(row))))
}

// -- Ratings --

pub async fn rate_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
    Json(req): Json<RateAdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::validation(
            "Qiimeyntu waa inay u dhaxaysaa 1 ilaa 5",
            "Rating must be between 1 and 5",
        ));
    }
    visible_ad(&state, ad_id, Some(claims.sub)).await?;

    let user_id = claims.sub;
    let rating = req.rating;
    let summary = state
        .db(move |db| db.upsert_rating(ad_id, user_id, rating))
        .await?;
    Ok(Json(summary))
}

use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use suuq_db::models::ProfileUpdate;
use suuq_types::api::{Claims, UpdateProfileRequest};
use suuq_types::catalog;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let profile = state
        .db(move |db| db.get_profile(user_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(profile))
}

/// Shop setup and profile edits. A shop needs a name, a known region and a
/// phone; without a shop only the phone is kept.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = validate(req)?;
    let user_id = claims.sub;
    let has_shop = update.has_shop;

    let profile = state
        .db(move |db| db.update_profile(user_id, &update))
        .await?
        .ok_or(ApiError::NotFound)?;

    info!("{} ({}) updated profile (shop: {})", claims.email, user_id, has_shop);
    Ok(Json(profile))
}

/// The caller's own ads, newest first, whatever their status.
pub async fn my_ads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let ads = state.db(move |db| db.list_ads_by_user(user_id)).await?;
    Ok(Json(ads))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(req: UpdateProfileRequest) -> Result<ProfileUpdate, ApiError> {
    let shop_name = non_empty(req.shop_name);
    let shop_region = non_empty(req.shop_region);
    let phone = non_empty(req.phone);

    if req.has_shop {
        if shop_name.is_none() || shop_region.is_none() || phone.is_none() {
            return Err(ApiError::validation(
                "Fadlan buuxi magaca dukaanka, gobolka iyo telefoonka",
                "Please fill shop name, region and phone",
            ));
        }
        if shop_region.as_deref().and_then(catalog::region).is_none() {
            return Err(ApiError::validation("Gobol aan la aqoon", "Unknown region"));
        }
    }

    Ok(ProfileUpdate {
        has_shop: req.has_shop,
        shop_name,
        shop_region,
        phone,
    })
}

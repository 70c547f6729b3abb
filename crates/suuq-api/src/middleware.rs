use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use suuq_types::api::Claims;
use suuq_types::i18n;

use crate::error::ApiError;
use crate::state::AppState;

/// Decode a bearer token and confirm its session row is still live.
async fn authenticate(state: &AppState, token: &str) -> Result<Claims, ApiError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?
    .claims;

    let (sid, user_id) = (claims.sid, claims.sub);
    let active = state
        .db(move |db| db.session_is_active(sid, user_id))
        .await?;
    if !active {
        return Err(ApiError::Unauthorized);
    }
    Ok(claims)
}

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = auth.ok_or(ApiError::Unauthorized)?;
    let claims = authenticate(&state, bearer.token()).await?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but anonymous callers pass through without claims.
pub async fn optional_auth(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = auth {
        match authenticate(&state, bearer.token()).await {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => warn!("Ignoring invalid credentials on public route: {}", e),
        }
    }
    next.run(req).await
}

/// Admin authority comes from the stored profile on every request, never
/// from the token. Runs after `require_auth`.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = claims.sub;
    let profile = state.db(move |db| db.get_profile(user_id)).await?;

    match profile {
        Some(profile) if profile.subscription_plan.is_admin() => Ok(next.run(req).await),
        _ => {
            warn!("{} ({}) denied admin access", claims.email, claims.sub);
            Err(ApiError::Forbidden(i18n::ERROR_ADMIN_ONLY))
        }
    }
}

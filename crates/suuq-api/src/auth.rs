use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use suuq_db::models::NewAccount;
use suuq_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, SessionResponse};
use suuq_types::i18n::Text;
use suuq_types::models::SubscriptionPlan;

use crate::error::ApiError;
use crate::state::AppState;

/// How long a login lasts.
const SESSION_DAYS: i64 = 30;

const MIN_PASSWORD_LEN: usize = 6;

const INVALID_LOGIN: Text = Text::new(
    "Email ama furaha sirta ah waa khalad",
    "Invalid email or password",
);

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Furaha sirta ah waa inuu ahaadaa ugu yaraan 6 xaraf",
            "Password must be at least 6 characters",
        ));
    }
    if req
        .confirm_password
        .as_deref()
        .is_some_and(|confirm| confirm != req.password)
    {
        return Err(ApiError::validation(
            "Furayaasha sirta ah isma laha",
            "Passwords do not match",
        ));
    }

    let lookup = email.clone();
    if state.db(move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::conflict(
            "Email-kan horay ayaa loo diiwaangeliyay",
            "This email is already registered",
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    let plan = if state.admin_emails.contains(&email) {
        SubscriptionPlan::Admin
    } else {
        SubscriptionPlan::Free
    };

    let user_id = Uuid::new_v4();
    let account_email = email.clone();
    state
        .db(move |db| {
            db.create_account(&NewAccount {
                id: user_id,
                email: &account_email,
                password_hash: &password_hash,
                plan,
            })
        })
        .await?;

    info!("Registered {} ({}) on the {} plan", email, user_id, plan);

    let token = start_session(&state, user_id, &email).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let lookup = email.clone();
    let Some(user) = state.db(move |db| db.get_user_by_email(&lookup)).await? else {
        warn!("Login for unknown email {}", email);
        return Err(ApiError::Validation(INVALID_LOGIN));
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored hash for {} is unreadable: {}", user.id, e))?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!("Wrong password for {}", email);
        return Err(ApiError::Validation(INVALID_LOGIN));
    }

    let token = start_session(&state, user.id, &user.email).await?;
    Ok(Json(AuthResponse {
        user_id: user.id,
        email: user.email,
        token,
    }))
}

/// Revoke the session behind the caller's token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = claims.sid;
    state.db(move |db| db.delete_session(sid)).await?;
    let closed = state.dispatcher.close_session(claims.sub, sid).await;
    info!(
        "{} ({}) logged out, closed {} gateway connection(s)",
        claims.email, claims.sub, closed
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (user, profile) = state
        .db(move |db| Ok((db.get_user(user_id)?, db.get_profile(user_id)?)))
        .await?;

    match (user, profile) {
        (Some(user), Some(profile)) => Ok(Json(SessionResponse { user, profile })),
        _ => Err(ApiError::Unauthorized),
    }
}

async fn start_session(state: &AppState, user_id: Uuid, email: &str) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .db(move |db| db.create_session(session_id, user_id, expires_at))
        .await?;

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        sid: session_id,
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(anyhow::Error::from)?;
    Ok(token)
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::validation(
            "Fadlan geli email sax ah",
            "Please enter a valid email",
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Hodan@Example.SO ").unwrap(), "hodan@example.so");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.so").is_err());
        assert!(normalize_email("a@localhost").is_err());
    }
}

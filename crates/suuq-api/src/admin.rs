//! Moderation and manual payment review. Every route here sits behind
//! `require_admin`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use suuq_types::api::{AdminUserDetail, Claims};
use suuq_types::i18n::Text;
use suuq_types::models::{AdStatus, ApprovalStatus, NotificationKind, PaymentStatus};

use crate::error::ApiError;
use crate::state::AppState;

const NOTE_PAYMENT_CONFIRMED: &str = "Payment verified and approved";
const NOTE_PAYMENT_REJECTED: &str = "Payment rejected";

fn already_processed() -> ApiError {
    ApiError::conflict(
        "Horeba waa la go'aamiyay",
        "This request has already been processed",
    )
}

// -- Ads --

pub async fn pending_ads(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let ads = state
        .db(|db| db.list_ads_by_status(AdStatus::Pending))
        .await?;
    Ok(Json(ads))
}

pub async fn approve_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_ad(state, claims, ad_id, AdStatus::Approved).await
}

pub async fn reject_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_ad(state, claims, ad_id, AdStatus::Rejected).await
}

async fn decide_ad(
    state: AppState,
    claims: Claims,
    ad_id: Uuid,
    to: AdStatus,
) -> Result<impl IntoResponse, ApiError> {
    let (updated, exists) = state
        .db(move |db| match db.transition_ad(ad_id, AdStatus::Pending, to)? {
            Some(ad) => Ok((Some(ad), true)),
            None => Ok((None, db.get_ad(ad_id)?.is_some())),
        })
        .await?;

    let Some(ad) = updated else {
        if !exists {
            return Err(ApiError::NotFound);
        }
        warn!("{} tried to {} ad {} which is no longer pending", claims.email, to, ad_id);
        return Err(already_processed());
    };

    info!("{} ({}) marked ad {} {}", claims.email, claims.sub, ad_id, to);

    let (kind, title, message) = if to == AdStatus::Approved {
        (
            NotificationKind::AdApproved,
            Text::new("Xayeysiiska waa la ansixiyay", "Ad approved"),
            Text::owned(
                format!("Xayeysiiskaaga \"{}\" hadda waa muuqdaa", ad.title),
                format!("Your ad \"{}\" is now live", ad.title),
            ),
        )
    } else {
        (
            NotificationKind::AdRejected,
            Text::new("Xayeysiiska waa la diiday", "Ad rejected"),
            Text::owned(
                format!("Xayeysiiskaaga \"{}\" lama ansixin", ad.title),
                format!("Your ad \"{}\" was not approved", ad.title),
            ),
        )
    };
    state.notify(ad.user_id, kind, title, message, Some(ad.id)).await;

    Ok(Json(ad))
}

pub async fn delete_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db(move |db| db.delete_ad(ad_id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("{} ({}) removed ad {}", claims.email, claims.sub, ad_id);
    Ok(StatusCode::NO_CONTENT)
}

// -- Payments --

pub async fn list_payments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let payments = state.db(|db| db.list_payment_reviews()).await?;
    Ok(Json(payments))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_payment(state, claims, id, PaymentStatus::Confirmed).await
}

pub async fn reject_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_payment(state, claims, id, PaymentStatus::Rejected).await
}

async fn decide_payment(
    state: AppState,
    claims: Claims,
    id: Uuid,
    status: PaymentStatus,
) -> Result<impl IntoResponse, ApiError> {
    let confirmed = status == PaymentStatus::Confirmed;
    let notes = if confirmed {
        NOTE_PAYMENT_CONFIRMED
    } else {
        NOTE_PAYMENT_REJECTED
    };

    let (outcome, exists) = state
        .db(move |db| match db.decide_payment(id, status, notes)? {
            Some(outcome) => Ok((Some(outcome), true)),
            None => Ok((None, db.get_payment(id)?.is_some())),
        })
        .await?;

    let Some(outcome) = outcome else {
        return Err(if exists { already_processed() } else { ApiError::NotFound });
    };
    let payment = outcome.record;

    info!(
        "{} ({}) marked {} payment {} {}{}",
        claims.email,
        claims.sub,
        payment.payment_type,
        id,
        status,
        if outcome.plan_upgraded { ", user upgraded to pro" } else { "" }
    );

    let (kind, title, message) = if confirmed {
        (
            NotificationKind::PaymentConfirmed,
            Text::new("Lacag-bixinta waa la xaqiijiyay", "Payment confirmed"),
            Text::owned(
                format!("Lacagtaada ${} waa la xaqiijiyay", payment.amount),
                format!("Your payment of ${} was verified", payment.amount),
            ),
        )
    } else {
        (
            NotificationKind::PaymentRejected,
            Text::new("Lacag-bixinta waa la diiday", "Payment rejected"),
            Text::owned(
                format!("Lacagtaada ${} lama xaqiijin", payment.amount),
                format!("Your payment of ${} could not be verified", payment.amount),
            ),
        )
    };
    state
        .notify(payment.user_id, kind, title, message, Some(payment.id))
        .await;

    Ok(Json(payment))
}

// -- Subscription approvals --

pub async fn list_approvals(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let approvals = state.db(|db| db.list_pending_approvals()).await?;
    Ok(Json(approvals))
}

pub async fn approve_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_subscription(state, claims, id, ApprovalStatus::Approved).await
}

pub async fn reject_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    decide_subscription(state, claims, id, ApprovalStatus::Rejected).await
}

async fn decide_subscription(
    state: AppState,
    claims: Claims,
    id: Uuid,
    status: ApprovalStatus,
) -> Result<impl IntoResponse, ApiError> {
    let admin_id = claims.sub;
    let (outcome, exists) = state
        .db(move |db| match db.decide_approval(id, status, admin_id)? {
            Some(outcome) => Ok((Some(outcome), true)),
            None => Ok((None, db.get_approval(id)?.is_some())),
        })
        .await?;

    let Some(outcome) = outcome else {
        return Err(if exists { already_processed() } else { ApiError::NotFound });
    };
    let approval = outcome.record;

    info!(
        "{} ({}) marked subscription request {} {}",
        claims.email, admin_id, id, status
    );

    let (kind, title, message) = match approval.subscription_expires_at {
        Some(expires) if status == ApprovalStatus::Approved => {
            let date = expires.format("%Y-%m-%d");
            (
                NotificationKind::SubscriptionApproved,
                Text::new("Rukunka waa la ansixiyay", "Subscription approved"),
                Text::owned(
                    format!("Akoonkaagu waa Pro ilaa {}", date),
                    format!("Your account is Pro until {}", date),
                ),
            )
        }
        _ => (
            NotificationKind::SubscriptionRejected,
            Text::new("Rukunka waa la diiday", "Subscription rejected"),
            Text::new(
                "Codsigaaga rukunka lama ansixin",
                "Your subscription request was not approved",
            ),
        ),
    };
    state
        .notify(approval.user_id, kind, title, message, Some(approval.id))
        .await;

    Ok(Json(approval))
}

// -- Users --

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let profiles = state.db(|db| db.list_profiles()).await?;
    Ok(Json(profiles))
}

/// Everything an admin needs to judge one account.
pub async fn user_detail(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db(move |db| {
            let Some(profile) = db.get_profile(user_id)? else {
                return Ok(None);
            };
            Ok(Some(AdminUserDetail {
                profile,
                ads: db.list_ads_by_user(user_id)?,
                payments: db.list_payments_by_user(user_id)?,
                approvals: db.list_approvals_by_user(user_id)?,
            }))
        })
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(detail))
}

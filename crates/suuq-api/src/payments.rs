use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use suuq_db::models::{NewApproval, NewPayment};
use suuq_types::api::{
    CatalogResponse, Claims, CreatePaymentRequest, PlanInfo, PlansResponse, RegionInfo,
    SubscriptionRequest,
};
use suuq_types::catalog;
use suuq_types::models::{AdminApproval, PaymentApproval, PaymentType, SubscriptionPlan};
use suuq_types::pricing::{DEFAULT_SUBSCRIPTION_DAYS, FREE_AD_LIMIT};

use crate::error::ApiError;
use crate::state::AppState;

/// Longest subscription a single request may ask for.
const MAX_SUBSCRIPTION_DAYS: i64 = 366;

#[derive(Serialize)]
pub struct MyPayments {
    pub payments: Vec<PaymentApproval>,
    pub approvals: Vec<AdminApproval>,
}

/// POST /payments: a stand-alone pro upgrade. Promotion payments are only
/// recorded together with the ad they promote.
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.payment_type != PaymentType::ProUpgrade {
        return Err(ApiError::validation(
            "Lacag-bixintan waxay la socotaa xayeysiis",
            "Promotion payments are made when posting an ad",
        ));
    }

    let user_id = claims.sub;
    let profile = state
        .db(move |db| db.get_profile(user_id))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    if profile.subscription_plan != SubscriptionPlan::Free {
        return Err(ApiError::conflict(
            "Horeba waxaad leedahay Pro",
            "Your account is already upgraded",
        ));
    }

    let quote = state.pricing.quote(PaymentType::ProUpgrade);
    if !req.confirmed {
        return Err(ApiError::PaymentRequired(quote));
    }

    let payment = NewPayment {
        id: Uuid::new_v4(),
        user_id,
        ad_id: None,
        payment_type: quote.payment_type,
        amount: quote.amount,
        payment_phone: quote.payment_phone,
        shop_name: profile.shop_name,
    };
    let payment = state.db(move |db| db.insert_payment(&payment)).await?;

    info!("{} ({}) submitted pro upgrade payment {}", claims.email, user_id, payment.id);
    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST /subscriptions/requests
pub async fn request_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Option<Json<SubscriptionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let duration = req.duration_days.unwrap_or(DEFAULT_SUBSCRIPTION_DAYS);
    if !(1..=MAX_SUBSCRIPTION_DAYS).contains(&duration) {
        return Err(ApiError::validation(
            "Muddada rukunka sax ma aha",
            "Invalid subscription duration",
        ));
    }

    let approval = NewApproval {
        id: Uuid::new_v4(),
        user_id: claims.sub,
        approval_type: "subscription".to_string(),
        amount: Some(state.pricing.pro_upgrade),
        notes: req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        subscription_duration: duration,
    };
    let approval = state.db(move |db| db.insert_approval(&approval)).await?;

    info!(
        "{} ({}) requested a {} day subscription ({})",
        claims.email, claims.sub, duration, approval.id
    );
    Ok((StatusCode::CREATED, Json(approval)))
}

/// GET /payments/mine
pub async fn my_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (payments, approvals) = state
        .db(move |db| {
            Ok((
                db.list_payments_by_user(user_id)?,
                db.list_approvals_by_user(user_id)?,
            ))
        })
        .await?;
    Ok(Json(MyPayments { payments, approvals }))
}

/// GET /plans
pub async fn plans(State(state): State<AppState>) -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: vec![
            PlanInfo {
                id: SubscriptionPlan::Free.as_str(),
                price: 0.0,
                ad_limit: Some(FREE_AD_LIMIT),
            },
            PlanInfo {
                id: SubscriptionPlan::Pro.as_str(),
                price: state.pricing.pro_upgrade,
                ad_limit: None,
            },
        ],
        pricing: state.pricing.clone(),
    })
}

/// GET /catalog: categories plus regions with their dial codes.
pub async fn catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        categories: catalog::CATEGORIES,
        regions: catalog::REGIONS
            .iter()
            .map(|region| RegionInfo {
                region: *region,
                dial_code: region.country.dial_code(),
            })
            .collect(),
    })
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use suuq_db::models::{AdFilter, NewAd, NewPayment};
use suuq_types::api::{
    AdDetailResponse, Claims, ListingQuery, PostAdRequest, PostAdResponse, SearchQuery,
};
use suuq_types::catalog;
use suuq_types::i18n::{self, Text};
use suuq_types::models::{Ad, AdStatus, Currency, PaymentType, Profile};
use suuq_types::pricing::{PostCheck, Promotion, check_post};

use crate::error::ApiError;
use crate::i18n::Lang;
use crate::state::AppState;

pub const MAX_IMAGES: usize = 5;

const DEFAULT_LISTING_LIMIT: u32 = 20;
const DEFAULT_SEARCH_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

/// POST /ads: enforce the free-plan limit and promotion fees, then insert
/// the ad (with its confirmed payment) in one transaction.
pub async fn post_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Lang(lang): Lang,
    Json(req): Json<PostAdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let profile = state
        .db(move |db| db.get_profile(user_id))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let promotion = Promotion {
        boost: req.boost,
        highlight: req.highlight,
    };
    let confirmed = req.payment.as_ref().is_some_and(|p| p.confirmed);
    let new_ad = build_ad(req, &profile, promotion)?;

    let quote = match check_post(
        profile.subscription_plan,
        profile.ad_count,
        promotion,
        confirmed,
        &state.pricing,
    ) {
        PostCheck::PaymentRequired(quote) => {
            info!(
                "{} ({}) post held for {} payment of {}",
                claims.email, user_id, quote.payment_type, quote.amount
            );
            return Err(ApiError::PaymentRequired(quote));
        }
        PostCheck::Proceed { payment } => payment,
    };

    let payment = quote.map(|quote| NewPayment {
        id: Uuid::new_v4(),
        user_id,
        ad_id: (quote.payment_type != PaymentType::ProUpgrade).then_some(new_ad.id),
        payment_type: quote.payment_type,
        amount: quote.amount,
        payment_phone: quote.payment_phone,
        shop_name: Some(new_ad.shop_name.clone()),
    });

    let (ad, payment) = state
        .db(move |db| db.insert_ad(&new_ad, payment.as_ref()))
        .await?;

    info!(
        "{} ({}) posted ad {} as {}{}",
        claims.email,
        user_id,
        ad.id,
        ad.status,
        payment
            .as_ref()
            .map(|p| format!(" with {} payment {}", p.payment_type, p.id))
            .unwrap_or_default()
    );

    let notice = if payment.is_some() {
        i18n::NOTICE_PAYMENT_IN_REVIEW
    } else if ad.status == AdStatus::Pending {
        i18n::NOTICE_AD_IN_REVIEW
    } else {
        i18n::NOTICE_AD_LIVE
    };

    Ok((
        StatusCode::CREATED,
        Json(PostAdResponse {
            ad,
            payment,
            notice: notice.get(lang).to_string(),
        }),
    ))
}

/// GET /ads: approved ads, highlighted then boosted then newest.
pub async fn list_ads(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AdFilter {
        category: query.category.filter(|c| !c.is_empty() && c != "all"),
        limit: query.limit.unwrap_or(DEFAULT_LISTING_LIMIT).clamp(1, MAX_LIMIT),
        ..Default::default()
    };
    let ads = state.db(move |db| db.list_public_ads(&filter)).await?;
    Ok(Json(ads))
}

/// GET /search
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = search_filter(query)?;
    let ads = state.db(move |db| db.list_public_ads(&filter)).await?;
    Ok(Json(ads))
}

/// GET /ads/{id}: public for live ads; owners and admins also see their
/// pending and rejected ones.
pub async fn get_ad(
    State(state): State<AppState>,
    Path(ad_id): Path<Uuid>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.map(|Extension(c)| c.sub);
    let ad = visible_ad(&state, ad_id, viewer).await?;
    let rating = state.db(move |db| db.rating_summary(ad_id)).await?;
    Ok(Json(AdDetailResponse { ad, rating }))
}

/// POST /ads/{id}/stock: owner flips approved and out_of_stock.
pub async fn toggle_stock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let ad = owned_ad(&state, ad_id, claims.sub).await?;
    let Some(next) = ad.status.stock_toggle() else {
        return Err(ApiError::conflict(
            "Xayeysiiskan weli lama ansixin",
            "Only live ads can change stock status",
        ));
    };

    let from = ad.status;
    let updated = state
        .db(move |db| db.transition_ad(ad_id, from, next))
        .await?
        .ok_or_else(|| {
            ApiError::conflict(
                "Xaaladda xayeysiiska way isbeddeshay",
                "The ad changed status, reload and retry",
            )
        })?;

    info!("{} ({}) marked ad {} {}", claims.email, claims.sub, ad_id, next);
    Ok(Json(updated))
}

/// DELETE /ads/{id}: owner only, hard delete.
pub async fn delete_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_ad(&state, ad_id, claims.sub).await?;
    state.db(move |db| db.delete_ad(ad_id)).await?;
    info!("{} ({}) deleted ad {}", claims.email, claims.sub, ad_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn owned_ad(state: &AppState, ad_id: Uuid, user_id: Uuid) -> Result<Ad, ApiError> {
    let ad = state
        .db(move |db| db.get_ad(ad_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    if ad.user_id != user_id {
        warn!("{} tried to modify ad {} owned by {}", user_id, ad_id, ad.user_id);
        return Err(ApiError::Forbidden(Text::new(
            "Xayeysiiskan adiga ma lihid",
            "You do not own this ad",
        )));
    }
    Ok(ad)
}

/// Load an ad the viewer is allowed to see. Hidden ads answer 404 so their
/// existence does not leak.
pub(crate) async fn visible_ad(
    state: &AppState,
    ad_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Ad, ApiError> {
    let (ad, viewer_profile) = state
        .db(move |db| {
            let Some(ad) = db.get_ad(ad_id)? else {
                return Ok((None, None));
            };
            let viewer_profile = match viewer {
                Some(id) if !ad.status.is_public() && id != ad.user_id => db.get_profile(id)?,
                _ => None,
            };
            Ok((Some(ad), viewer_profile))
        })
        .await?;

    let ad = ad.ok_or(ApiError::NotFound)?;
    if !can_view(&ad, viewer, viewer_profile.as_ref()) {
        return Err(ApiError::NotFound);
    }
    Ok(ad)
}

fn can_view(ad: &Ad, viewer: Option<Uuid>, viewer_profile: Option<&Profile>) -> bool {
    ad.status.is_public()
        || viewer == Some(ad.user_id)
        || viewer_profile.is_some_and(|p| p.subscription_plan.is_admin())
}

fn required(value: String, so: &'static str, en: &'static str) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::validation(so, en));
    }
    Ok(value)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate a post and fill shop details from the poster's profile.
fn build_ad(req: PostAdRequest, profile: &Profile, promotion: Promotion) -> Result<NewAd, ApiError> {
    let title = required(req.title, "Cinwaanka waa loo baahan yahay", "Title is required")?;
    let description = required(
        req.description,
        "Faahfaahinta waa loo baahan yahay",
        "Description is required",
    )?;
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(ApiError::validation("Qiimaha sax ma aha", "Price is invalid"));
    }

    let category = catalog::category(req.category.trim())
        .ok_or_else(|| ApiError::validation("Qayb aan la aqoon", "Unknown category"))?;
    let region = catalog::region(req.region.trim())
        .ok_or_else(|| ApiError::validation("Gobol aan la aqoon", "Unknown region"))?;

    let phone = optional(req.phone)
        .or_else(|| profile.phone.clone())
        .ok_or(ApiError::Validation(i18n::ERROR_REQUIRED_FIELDS))?;
    let shop_name = optional(req.shop_name)
        .or_else(|| profile.shop_name.clone())
        .ok_or(ApiError::Validation(i18n::ERROR_REQUIRED_FIELDS))?;

    let image_urls: Vec<String> = req
        .image_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if image_urls.len() > MAX_IMAGES {
        return Err(ApiError::validation(
            "Ugu badnaan 5 sawir ayaad soo gelin kartaa",
            "You can upload at most 5 images",
        ));
    }

    let cv_url = optional(req.cv_url);
    if category.requires_cv() && cv_url.is_none() {
        return Err(ApiError::validation(
            "Shaqooyinka waxay u baahan yihiin CV",
            "Job ads need a CV",
        ));
    }

    let jobs = category.requires_cv();
    let details = category.has_item_details();
    let now = Utc::now();

    Ok(NewAd {
        id: Uuid::new_v4(),
        user_id: profile.user_id,
        title,
        description,
        price: req.price,
        currency: req.currency.unwrap_or(Currency::Usd),
        category: category.id.to_string(),
        region: region.name.to_string(),
        phone,
        shop_name,
        image_urls,
        cv_url,
        job_title: optional(req.job_title).filter(|_| jobs),
        salary: optional(req.salary).filter(|_| jobs),
        experience: optional(req.experience).filter(|_| jobs),
        brand: optional(req.brand).filter(|_| details),
        model: optional(req.model).filter(|_| details),
        year: optional(req.year).filter(|_| details),
        condition: optional(req.condition).filter(|_| details),
        status: promotion.initial_status(),
        is_boosted: promotion.boost,
        is_highlighted: promotion.highlight,
        boost_expires_at: promotion.expires_at(now),
        created_at: now,
    })
}

/// Parse `"min-max"` or `"min-"`.
fn parse_price_range(range: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (min, max) = range.split_once('-')?;
    let bound = |s: &str| -> Option<Option<f64>> {
        let s = s.trim();
        if s.is_empty() {
            Some(None)
        } else {
            s.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
        }
    };
    Some((bound(min)?, bound(max)?))
}

fn search_filter(query: SearchQuery) -> Result<AdFilter, ApiError> {
    let (mut min_price, mut max_price) = (query.min_price, query.max_price);
    if let Some(range) = query.price.as_deref().filter(|p| !p.is_empty() && *p != "all") {
        let (min, max) = parse_price_range(range).ok_or_else(|| {
            ApiError::validation("Qiime aan sax ahayn", "Invalid price range")
        })?;
        min_price = min_price.or(min);
        max_price = max_price.or(max);
    }

    let keep = |v: Option<String>| v.filter(|s| !s.is_empty() && s != "all");
    Ok(AdFilter {
        text: query.q.filter(|q| !q.trim().is_empty()),
        category: keep(query.category),
        region: keep(query.region),
        min_price,
        max_price,
        limit: query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_LIMIT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ranges() {
        assert_eq!(parse_price_range("100-500"), Some((Some(100.0), Some(500.0))));
        assert_eq!(parse_price_range("1000-"), Some((Some(1000.0), None)));
        assert_eq!(parse_price_range("abc"), None);
        assert_eq!(parse_price_range("x-5"), None);
    }

    #[test]
    fn search_defaults() {
        let filter = search_filter(SearchQuery {
            q: Some("  ".into()),
            category: Some("all".into()),
            price: Some("0-100".into()),
            max_price: Some(50.0),
            ..Default::default()
        })
        .unwrap();
        assert!(filter.text.is_none());
        assert!(filter.category.is_none());
        assert_eq!(filter.min_price, Some(0.0));
        assert_eq!(filter.max_price, Some(50.0));
        assert_eq!(filter.limit, DEFAULT_SEARCH_LIMIT);
    }
}

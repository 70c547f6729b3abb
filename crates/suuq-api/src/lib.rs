pub mod admin;
pub mod ads;
pub mod auth;
pub mod engagement;
pub mod error;
pub mod i18n;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod payments;
pub mod profiles;
pub mod state;
pub mod storage;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};

use crate::middleware::{optional_auth, require_admin, require_auth};
pub use crate::state::{AppState, AppStateInner};

/// The HTTP API. The server adds the gateway, static files, CORS and
/// tracing on top.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/ads", get(ads::list_ads))
        .route("/search", get(ads::search))
        .route("/plans", get(payments::plans))
        .route("/catalog", get(payments::catalog));

    let detail_routes = Router::new()
        .route("/ads/{id}", get(ads::get_ad))
        .route("/ads/{id}/comments", get(engagement::list_comments))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        .route("/profile", get(profiles::get_profile).put(profiles::update_profile))
        .route("/profile/ads", get(profiles::my_ads))
        .route("/ads", post(ads::post_ad))
        .route("/ads/{id}", delete(ads::delete_ad))
        .route("/ads/{id}/stock", post(ads::toggle_stock))
        .route("/ads/{id}/favorite", post(engagement::toggle_favorite))
        .route("/ads/{id}/comments", post(engagement::add_comment))
        .route("/ads/{id}/rating", put(engagement::rate_ad))
        .route("/favorites", get(engagement::list_favorites))
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::list_conversations))
        .route("/messages/{ad_id}/{user_id}", get(messages::get_thread))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/payments", post(payments::create_payment))
        .route("/payments/mine", get(payments::my_payments))
        .route("/subscriptions/requests", post(payments::request_subscription))
        .route(
            "/uploads/{bucket}",
            post(uploads::upload).layer(DefaultBodyLimit::max(uploads::UPLOAD_BODY_LIMIT)),
        )
        .route("/uploads/{bucket}/{user_id}/{file}", delete(uploads::delete_upload))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // require_auth runs first (outermost), then require_admin.
    let admin_routes = Router::new()
        .route("/admin/ads/pending", get(admin::pending_ads))
        .route("/admin/ads/{id}/approve", post(admin::approve_ad))
        .route("/admin/ads/{id}/reject", post(admin::reject_ad))
        .route("/admin/ads/{id}", delete(admin::delete_ad))
        .route("/admin/payments", get(admin::list_payments))
        .route("/admin/payments/{id}/confirm", post(admin::confirm_payment))
        .route("/admin/payments/{id}/reject", post(admin::reject_payment))
        .route("/admin/approvals", get(admin::list_approvals))
        .route("/admin/approvals/{id}/approve", post(admin::approve_subscription))
        .route("/admin/approvals/{id}/reject", post(admin::reject_subscription))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{user_id}", get(admin::user_detail))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(detail_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(from_fn(i18n::localize))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

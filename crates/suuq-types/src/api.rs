use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Category, Region};
use crate::models::{
    Ad, AdminApproval, Currency, Message, Notification, PaymentApproval, PaymentType, Profile,
    User,
};
use crate::pricing::Pricing;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    /// Session row backing this token; logging out deletes it.
    pub sid: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: User,
    pub profile: Profile,
}

// -- Profile --

/// Shop setup and profile edits.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub has_shop: bool,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub shop_region: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// -- Ads --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfirmation {
    /// The poster asserts they sent the quoted amount.
    pub confirmed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostAdRequest {
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub currency: Option<Currency>,
    pub category: String,
    pub region: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub cv_url: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub boost: bool,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub payment: Option<PaymentConfirmation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostAdResponse {
    pub ad: Ad,
    pub payment: Option<PaymentApproval>,
    /// Localised confirmation for the poster.
    pub notice: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    /// `"min-max"` or `"min-"`.
    pub price: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdDetailResponse {
    pub ad: Ad,
    pub rating: RatingSummary,
}

// -- Engagement --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateAdRequest {
    pub rating: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteToggleResponse {
    pub favorited: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub favorite_id: Uuid,
    pub favorited_at: DateTime<Utc>,
    pub ad: Ad,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub ad_id: Uuid,
    pub message: String,
    /// Required when the ad owner replies; defaults to the ad owner.
    #[serde(default)]
    pub receiver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub ad_id: Uuid,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub ad_title: String,
    pub ad_price: f64,
    pub ad_currency: Currency,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    /// Messages received since the caller last wrote in this conversation.
    pub unread_count: usize,
}

// -- Notifications --

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

// -- Payments & subscriptions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePaymentRequest {
    pub payment_type: PaymentType,
    pub confirmed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub id: &'static str,
    pub price: f64,
    /// `None` means unlimited.
    pub ad_limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanInfo>,
    pub pricing: Pricing,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub categories: &'static [Category],
    pub regions: Vec<RegionInfo>,
}

#[derive(Debug, Serialize)]
pub struct RegionInfo {
    #[serde(flatten)]
    pub region: Region,
    pub dial_code: &'static str,
}

// -- Uploads --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentReview {
    #[serde(flatten)]
    pub payment: PaymentApproval,
    pub payer_email: Option<String>,
    pub payer_shop_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovalReview {
    #[serde(flatten)]
    pub approval: AdminApproval,
    pub requester_email: Option<String>,
    pub requester_shop_name: Option<String>,
    pub requester_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserDetail {
    pub profile: Profile,
    pub ads: Vec<Ad>,
    pub payments: Vec<PaymentApproval>,
    pub approvals: Vec<AdminApproval>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationThread {
    pub ad_id: Uuid,
    pub other_user_id: Uuid,
    pub messages: Vec<Message>,
}

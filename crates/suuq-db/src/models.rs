/// Write-side records and joined read rows. Plain entity reads come back as
/// `suuq_types::models` values, parsed at the row boundary.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use suuq_types::models::{Ad, AdStatus, Currency, Message, PaymentType, SubscriptionPlan};

/// Identity row including the password hash; never leaves the server.
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewAccount<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub plan: SubscriptionPlan,
}

/// Shop fields written by shop setup and profile edits.
pub struct ProfileUpdate {
    pub has_shop: bool,
    pub shop_name: Option<String>,
    pub shop_region: Option<String>,
    pub phone: Option<String>,
}

pub struct NewAd {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub currency: Currency,
    pub category: String,
    pub region: String,
    pub phone: String,
    pub shop_name: String,
    pub image_urls: Vec<String>,
    pub cv_url: Option<String>,
    pub job_title: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub condition: Option<String>,
    pub status: AdStatus,
    pub is_boosted: bool,
    pub is_highlighted: bool,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub amount: f64,
    pub payment_phone: String,
    pub shop_name: Option<String>,
}

pub struct NewApproval {
    pub id: Uuid,
    pub user_id: Uuid,
    pub approval_type: String,
    pub amount: Option<f64>,
    pub notes: Option<String>,
    pub subscription_duration: i64,
}

/// Filters for public listings. Only approved ads are ever returned.
#[derive(Debug, Default, Clone)]
pub struct AdFilter {
    pub text: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: u32,
}

pub struct CommentRow {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub shop_name: Option<String>,
    pub email: Option<String>,
}

pub struct FavoriteRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ad: Ad,
}

/// A message seen from one participant, joined with its ad and the other
/// participant's profile.
pub struct ConversationRow {
    pub message: Message,
    pub ad_title: String,
    pub ad_price: f64,
    pub ad_currency: Currency,
    pub other_shop_name: Option<String>,
    pub other_email: Option<String>,
}

/// Who to notify after an admin decision.
pub struct DecisionOutcome<T> {
    pub record: T,
    pub plan_upgraded: bool,
}

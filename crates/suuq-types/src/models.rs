use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A stored string did not match any variant of a status-like enum.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Enums stored as lowercase text columns and sent as the same strings on
/// the wire.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Moderation state of an ad.
    AdStatus, "ad status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        OutOfStock => "out_of_stock",
    }
);

impl AdStatus {
    /// Statuses anyone may open on the detail page.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Approved | Self::OutOfStock)
    }

    /// The status an owner's stock toggle leads to, if the toggle is allowed
    /// from here.
    pub fn stock_toggle(&self) -> Option<AdStatus> {
        match self {
            Self::Approved => Some(Self::OutOfStock),
            Self::OutOfStock => Some(Self::Approved),
            Self::Pending | Self::Rejected => None,
        }
    }
}

text_enum!(
    SubscriptionPlan, "subscription plan" {
        Free => "free",
        Pro => "pro",
        Admin => "admin",
    }
);

impl SubscriptionPlan {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

text_enum!(
    PaymentType, "payment type" {
        Boost => "boost",
        Highlight => "highlight",
        BoostHighlight => "boost_highlight",
        ProUpgrade => "pro_upgrade",
    }
);

text_enum!(
    PaymentStatus, "payment status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Rejected => "rejected",
    }
);

text_enum!(
    ApprovalStatus, "approval status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

text_enum!(
    Currency, "currency" {
        Usd => "USD",
        Sos => "SOS",
    }
);

text_enum!(
    NotificationKind, "notification kind" {
        AdApproved => "ad_approved",
        AdRejected => "ad_rejected",
        PaymentConfirmed => "payment_confirmed",
        PaymentRejected => "payment_rejected",
        SubscriptionApproved => "subscription_approved",
        SubscriptionRejected => "subscription_rejected",
        Message => "message",
    }
);

text_enum!(
    /// Upload buckets and the URL segment they are served under.
    Bucket, "bucket" {
        AdImages => "ad-images",
        CvFiles => "cv-files",
    }
);

impl Bucket {
    /// Largest accepted upload in bytes.
    pub fn max_size(&self) -> usize {
        match self {
            Self::AdImages => 5 * 1024 * 1024,
            Self::CvFiles => 10 * 1024 * 1024,
        }
    }

    /// Stored file extension for a MIME type, or `None` when the bucket does
    /// not take it. Only types a browser renders inertly are listed, so
    /// `image/svg+xml` and friends are refused.
    pub fn extension(&self, content_type: &str) -> Option<&'static str> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match (self, mime.as_str()) {
            (Self::AdImages, "image/jpeg" | "image/jpg") => Some("jpg"),
            (Self::AdImages, "image/png") => Some("png"),
            (Self::AdImages, "image/gif") => Some("gif"),
            (Self::AdImages, "image/webp") => Some("webp"),
            (Self::AdImages, "image/avif") => Some("avif"),
            (Self::CvFiles, "application/pdf") => Some("pdf"),
            (Self::CvFiles, "application/msword") => Some("doc"),
            (
                Self::CvFiles,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ) => Some("docx"),
            _ => None,
        }
    }

    /// Whether the bucket accepts this MIME type.
    pub fn accepts(&self, content_type: &str) -> bool {
        self.extension(content_type).is_some()
    }
}

/// An identity-provider account, without its password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user shop and plan record, distinct from the login identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub shop_name: Option<String>,
    pub shop_region: Option<String>,
    pub phone: Option<String>,
    pub has_shop: bool,
    pub shop_setup_completed: bool,
    pub subscription_plan: SubscriptionPlan,
    pub ad_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown to other users: shop name, else the e-mail local part.
    pub fn display_name(&self) -> String {
        display_name(self.user_id, self.shop_name.as_deref(), Some(&self.email))
    }
}

/// Shop name, else e-mail local part, else `User <first 8 id chars>`.
pub fn display_name(user_id: Uuid, shop_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = shop_name.filter(|s| !s.trim().is_empty()) {
        return name.to_string();
    }
    if let Some(local) = email
        .and_then(|e| e.split('@').next())
        .filter(|s| !s.is_empty())
    {
        return local.to_string();
    }
    let id = user_id.to_string();
    format!("User {}", &id[..8])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
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
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub ad_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A self-asserted payment waiting for (or past) manual admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentApproval {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub amount: f64,
    pub payment_phone: String,
    pub payment_confirmed_by_user: bool,
    pub shop_name: Option<String>,
    pub status: PaymentStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription request reviewed by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminApproval {
    pub id: Uuid,
    pub user_id: Uuid,
    pub approval_type: String,
    pub amount: Option<f64>,
    pub notes: Option<String>,
    pub status: ApprovalStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub subscription_duration: i64,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub related_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

//! Posting limits, promotion prices and the rule deciding whether a new ad
//! may be inserted or must wait for a payment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AdStatus, PaymentType, SubscriptionPlan};

/// Ads a free-plan user may post before the pro upgrade is required.
pub const FREE_AD_LIMIT: i64 = 5;

/// How long boost and highlight last.
pub const PROMOTION_DAYS: i64 = 30;

/// Subscription length when a request does not say.
pub const DEFAULT_SUBSCRIPTION_DAYS: i64 = 30;

/// Merchant number users send manual payments to.
pub const DEFAULT_PAYMENT_PHONE: &str = "+254757872221";

/// Prices in USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    pub pro_upgrade: f64,
    pub boost: f64,
    pub highlight: f64,
    pub boost_highlight: f64,
    pub payment_phone: String,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            pro_upgrade: 10.0,
            boost: 10.0,
            highlight: 8.0,
            boost_highlight: 15.0,
            payment_phone: DEFAULT_PAYMENT_PHONE.to_string(),
        }
    }
}

impl Pricing {
    pub fn amount(&self, payment_type: PaymentType) -> f64 {
        match payment_type {
            PaymentType::ProUpgrade => self.pro_upgrade,
            PaymentType::Boost => self.boost,
            PaymentType::Highlight => self.highlight,
            PaymentType::BoostHighlight => self.boost_highlight,
        }
    }

    pub fn quote(&self, payment_type: PaymentType) -> PaymentQuote {
        PaymentQuote {
            payment_type,
            amount: self.amount(payment_type),
            currency: "USD",
            payment_phone: self.payment_phone.clone(),
        }
    }
}

/// What the poster must pay, and where, before the post goes through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentQuote {
    pub payment_type: PaymentType,
    pub amount: f64,
    pub currency: &'static str,
    pub payment_phone: String,
}

/// Boost/highlight options chosen on the post form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Promotion {
    pub boost: bool,
    pub highlight: bool,
}

impl Promotion {
    pub fn is_requested(&self) -> bool {
        self.boost || self.highlight
    }

    pub fn payment_type(&self) -> Option<PaymentType> {
        match (self.boost, self.highlight) {
            (true, true) => Some(PaymentType::BoostHighlight),
            (true, false) => Some(PaymentType::Boost),
            (false, true) => Some(PaymentType::Highlight),
            (false, false) => None,
        }
    }

    /// Promoted ads wait for an admin; plain ads go live at once.
    pub fn initial_status(&self) -> AdStatus {
        if self.is_requested() {
            AdStatus::Pending
        } else {
            AdStatus::Approved
        }
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.is_requested()
            .then(|| now + Duration::days(PROMOTION_DAYS))
    }
}

/// Outcome of checking a new post against plan limits and promotion fees.
#[derive(Debug, Clone, PartialEq)]
pub enum PostCheck {
    /// Insert the ad, recording this user-confirmed payment alongside it.
    Proceed { payment: Option<PaymentQuote> },
    /// Nothing is inserted until the poster confirms this payment.
    PaymentRequired(PaymentQuote),
}

/// The free-plan limit takes precedence over promotion fees: a blocked
/// free user pays for the pro upgrade only.
pub fn check_post(
    plan: SubscriptionPlan,
    ad_count: i64,
    promotion: Promotion,
    payment_confirmed: bool,
    pricing: &Pricing,
) -> PostCheck {
    let due = if plan == SubscriptionPlan::Free && ad_count >= FREE_AD_LIMIT {
        Some(PaymentType::ProUpgrade)
    } else {
        promotion.payment_type()
    };

    match due {
        None => PostCheck::Proceed { payment: None },
        Some(kind) if payment_confirmed => PostCheck::Proceed {
            payment: Some(pricing.quote(kind)),
        },
        Some(kind) => PostCheck::PaymentRequired(pricing.quote(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: Promotion = Promotion { boost: false, highlight: false };
    const BOOST: Promotion = Promotion { boost: true, highlight: false };
    const BOTH: Promotion = Promotion { boost: true, highlight: true };

    #[test]
    fn plain_post_under_limit_goes_through() {
        let pricing = Pricing::default();
        assert_eq!(
            check_post(SubscriptionPlan::Free, 4, NONE, false, &pricing),
            PostCheck::Proceed { payment: None }
        );
        assert_eq!(NONE.initial_status(), AdStatus::Approved);
    }

    #[test]
    fn free_limit_asks_for_pro_upgrade() {
        let pricing = Pricing::default();
        match check_post(SubscriptionPlan::Free, 5, BOTH, false, &pricing) {
            PostCheck::PaymentRequired(quote) => {
                assert_eq!(quote.payment_type, PaymentType::ProUpgrade);
                assert_eq!(quote.amount, 10.0);
            }
            other => panic!("expected payment request, got {:?}", other),
        }
    }

    #[test]
    fn paid_plans_are_unlimited() {
        let pricing = Pricing::default();
        for plan in [SubscriptionPlan::Pro, SubscriptionPlan::Admin] {
            assert_eq!(
                check_post(plan, 500, NONE, false, &pricing),
                PostCheck::Proceed { payment: None }
            );
        }
    }

    #[test]
    fn promotion_prices() {
        let pricing = Pricing::default();
        let cases = [
            (BOOST, PaymentType::Boost, 10.0),
            (Promotion { boost: false, highlight: true }, PaymentType::Highlight, 8.0),
            (BOTH, PaymentType::BoostHighlight, 15.0),
        ];
        for (promotion, kind, amount) in cases {
            assert_eq!(promotion.initial_status(), AdStatus::Pending);
            match check_post(SubscriptionPlan::Free, 0, promotion, false, &pricing) {
                PostCheck::PaymentRequired(quote) => {
                    assert_eq!(quote.payment_type, kind);
                    assert_eq!(quote.amount, amount);
                }
                other => panic!("expected payment request, got {:?}", other),
            }
        }
    }

    #[test]
    fn confirmed_payment_proceeds_with_quote() {
        let pricing = Pricing::default();
        let check = check_post(SubscriptionPlan::Pro, 0, BOOST, true, &pricing);
        assert_eq!(
            check,
            PostCheck::Proceed { payment: Some(pricing.quote(PaymentType::Boost)) }
        );
    }

    #[test]
    fn promotion_expiry_is_thirty_days() {
        let now = Utc::now();
        assert_eq!(NONE.expires_at(now), None);
        assert_eq!(BOOST.expires_at(now), Some(now + Duration::days(30)));
    }
}

pub mod ads;
pub mod engagement;
pub mod expiry;
pub mod messages;
pub mod notifications;
pub mod payments;
pub mod users;

use std::str::FromStr;

use anyhow::Result;
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

/// Parse a TEXT column into a typed value, surfacing bad data as a
/// conversion error instead of trusting the stored shape.
pub(crate) fn parse_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    parse_at(row, idx)
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use uuid::Uuid;

    use suuq_types::models::{Currency, SubscriptionPlan};
    use suuq_types::pricing::Promotion;

    use crate::Database;
    use crate::models::{NewAccount, NewAd};

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn account(db: &Database, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_account(&NewAccount {
            id,
            email,
            password_hash: "hash",
            plan: SubscriptionPlan::Free,
        })
        .unwrap();
        id
    }

    pub fn new_ad(user_id: Uuid, title: &str, promotion: Promotion) -> NewAd {
        let now = Utc::now();
        NewAd {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            description: format!("{} for sale", title),
            price: 100.0,
            currency: Currency::Usd,
            category: "phones".to_string(),
            region: "Banaadir".to_string(),
            phone: "+252610000000".to_string(),
            shop_name: "Test Shop".to_string(),
            image_urls: vec![],
            cv_url: None,
            job_title: None,
            salary: None,
            experience: None,
            brand: None,
            model: None,
            year: None,
            condition: None,
            status: promotion.initial_status(),
            is_boosted: promotion.boost,
            is_highlighted: promotion.highlight,
            boost_expires_at: promotion.expires_at(now),
            created_at: now,
        }
    }
}

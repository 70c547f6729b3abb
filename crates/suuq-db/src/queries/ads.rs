use anyhow::Result;
use chrono::Utc;
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use suuq_types::models::{Ad, AdStatus, PaymentApproval};

use super::payments::insert_payment;
use super::{OptionalExt, parse_at, uuid_at};
use crate::Database;
use crate::models::{AdFilter, NewAd, NewPayment};

pub(crate) const AD_COLUMNS: &str = "a.id, a.user_id, a.title, a.description, a.price, a.currency, \
     a.category, a.region, a.phone, a.shop_name, a.image_urls, a.cv_url, a.job_title, a.salary, \
     a.experience, a.brand, a.model, a.year, a.condition, a.status, a.is_boosted, a.is_highlighted, \
     a.boost_expires_at, a.created_at, a.updated_at";

/// Number of columns in `AD_COLUMNS`; joined columns start here.
pub(crate) const AD_COLUMN_COUNT: usize = 25;

const LISTING_ORDER: &str =
    "ORDER BY a.is_highlighted DESC, a.is_boosted DESC, a.created_at DESC, a.rowid DESC";

pub(crate) fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<Ad> {
    let image_urls: String = row.get(10)?;
    let image_urls: Vec<String> = serde_json::from_str(&image_urls)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(Ad {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        currency: parse_at(row, 5)?,
        category: row.get(6)?,
        region: row.get(7)?,
        phone: row.get(8)?,
        shop_name: row.get(9)?,
        image_urls,
        cv_url: row.get(11)?,
        job_title: row.get(12)?,
        salary: row.get(13)?,
        experience: row.get(14)?,
        brand: row.get(15)?,
        model: row.get(16)?,
        year: row.get(17)?,
        condition: row.get(18)?,
        status: parse_at(row, 19)?,
        is_boosted: row.get(20)?,
        is_highlighted: row.get(21)?,
        boost_expires_at: row.get(22)?,
        created_at: row.get(23)?,
        updated_at: row.get(24)?,
    })
}

/// Escape LIKE wildcards so user text matches literally.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    /// Insert an ad, its user-confirmed payment if any, and bump the poster's
    /// `ad_count`, all or nothing.
    pub fn insert_ad(
        &self,
        ad: &NewAd,
        payment: Option<&NewPayment>,
    ) -> Result<(Ad, Option<PaymentApproval>)> {
        let image_urls = serde_json::to_string(&ad.image_urls)?;

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO ads (id, user_id, title, description, price, currency, category, region,
                                  phone, shop_name, image_urls, cv_url, job_title, salary, experience,
                                  brand, model, year, condition, status, is_boosted, is_highlighted,
                                  boost_expires_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?24)",
                rusqlite::params![
                    ad.id.to_string(),
                    ad.user_id.to_string(),
                    ad.title,
                    ad.description,
                    ad.price,
                    ad.currency.as_str(),
                    ad.category,
                    ad.region,
                    ad.phone,
                    ad.shop_name,
                    image_urls,
                    ad.cv_url,
                    ad.job_title,
                    ad.salary,
                    ad.experience,
                    ad.brand,
                    ad.model,
                    ad.year,
                    ad.condition,
                    ad.status.as_str(),
                    ad.is_boosted,
                    ad.is_highlighted,
                    ad.boost_expires_at,
                    ad.created_at,
                ],
            )?;

            let payment = match payment {
                Some(p) => Some(insert_payment(tx, p)?),
                None => None,
            };

            tx.execute(
                "UPDATE profiles SET ad_count = ad_count + 1, updated_at = ?2 WHERE user_id = ?1",
                rusqlite::params![ad.user_id.to_string(), ad.created_at],
            )?;

            let stored = query_ad(tx, ad.id)?
                .ok_or_else(|| anyhow::anyhow!("Ad {} vanished after insert", ad.id))?;
            Ok((stored, payment))
        })
    }

    pub fn get_ad(&self, id: Uuid) -> Result<Option<Ad>> {
        self.with_conn(|conn| query_ad(conn, id))
    }

    /// Approved ads matching `filter`, promoted ads first, newest first.
    pub fn list_public_ads(&self, filter: &AdFilter) -> Result<Vec<Ad>> {
        let mut clauses = vec!["a.status = 'approved'".to_string()];
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            params.push(Box::new(like_pattern(text)));
            let n = params.len();
            clauses.push(format!(
                "(a.title LIKE ?{n} ESCAPE '\\' OR a.description LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if let Some(category) = &filter.category {
            params.push(Box::new(category.clone()));
            clauses.push(format!("a.category = ?{}", params.len()));
        }
        if let Some(region) = &filter.region {
            params.push(Box::new(region.clone()));
            clauses.push(format!("a.region = ?{}", params.len()));
        }
        if let Some(min) = filter.min_price {
            params.push(Box::new(min));
            clauses.push(format!("a.price >= ?{}", params.len()));
        }
        if let Some(max) = filter.max_price {
            params.push(Box::new(max));
            clauses.push(format!("a.price <= ?{}", params.len()));
        }
        params.push(Box::new(filter.limit));

        let sql = format!(
            "SELECT {} FROM ads a WHERE {} {} LIMIT ?{}",
            AD_COLUMNS,
            clauses.join(" AND "),
            LISTING_ORDER,
            params.len()
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(refs.as_slice(), ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every ad a user posted, any status, newest first.
    pub fn list_ads_by_user(&self, user_id: Uuid) -> Result<Vec<Ad>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM ads a WHERE a.user_id = ?1 ORDER BY a.created_at DESC, a.rowid DESC",
                AD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_ads_by_status(&self, status: AdStatus) -> Result<Vec<Ad>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM ads a WHERE a.status = ?1 ORDER BY a.created_at DESC, a.rowid DESC",
                AD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status.as_str()], ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move an ad from `from` to `to`. Returns the updated ad, or `None`
    /// when the ad is missing or no longer in `from` (someone else won).
    pub fn transition_ad(&self, id: Uuid, from: AdStatus, to: AdStatus) -> Result<Option<Ad>> {
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE ads SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
                rusqlite::params![id.to_string(), from.as_str(), to.as_str(), Utc::now()],
            )?;
            if n == 0 {
                return Ok(None);
            }
            query_ad(tx, id)
        })
    }

    /// Hard delete. Comments, ratings, favorites and messages go with it.
    pub fn delete_ad(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM ads WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }
}

pub(crate) fn query_ad(conn: &Connection, id: Uuid) -> Result<Option<Ad>> {
    let sql = format!("SELECT {} FROM ads a WHERE a.id = ?1", AD_COLUMNS);
    conn.query_row(&sql, [id.to_string()], ad_from_row).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use suuq_types::models::PaymentType;
    use suuq_types::pricing::Promotion;

    fn listing(db: &Database) -> Vec<Ad> {
        db.list_public_ads(&AdFilter { limit: 20, ..Default::default() }).unwrap()
    }

    #[test]
    fn plain_ad_is_listed_and_counted() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "seller@example.so");

        let (ad, payment) = db
            .insert_ad(&fixtures::new_ad(user, "Samsung A54", Promotion::default()), None)
            .unwrap();
        assert_eq!(ad.status, AdStatus::Approved);
        assert!(payment.is_none());

        let listed = listing(&db);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ad.id);
        assert_eq!(db.get_profile(user).unwrap().unwrap().ad_count, 1);
    }

    #[test]
    fn promoted_ad_waits_and_links_payment() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "promo@example.so");
        let promotion = Promotion { boost: true, highlight: false };
        let new_ad = fixtures::new_ad(user, "Toyota Hilux", promotion);
        let payment = NewPayment {
            id: Uuid::new_v4(),
            user_id: user,
            ad_id: Some(new_ad.id),
            payment_type: PaymentType::Boost,
            amount: 10.0,
            payment_phone: "+254757872221".into(),
            shop_name: Some("Test Shop".into()),
        };

        let (ad, payment) = db.insert_ad(&new_ad, Some(&payment)).unwrap();
        assert_eq!(ad.status, AdStatus::Pending);
        assert!(ad.boost_expires_at.is_some());
        let payment = payment.unwrap();
        assert_eq!(payment.ad_id, Some(ad.id));
        assert!(payment.payment_confirmed_by_user);
        assert!(listing(&db).is_empty());
    }

    #[test]
    fn failed_insert_leaves_count_untouched() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "atomic@example.so");
        let new_ad = fixtures::new_ad(user, "Laptop", Promotion::default());
        db.insert_ad(&new_ad, None).unwrap();

        // Same id again violates the primary key.
        assert!(db.insert_ad(&new_ad, None).is_err());
        assert_eq!(db.get_profile(user).unwrap().unwrap().ad_count, 1);
    }

    #[test]
    fn listing_orders_promoted_first() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "order@example.so");

        let plain_old = fixtures::new_ad(user, "old plain", Promotion::default());
        let mut boosted = fixtures::new_ad(user, "boosted", Promotion { boost: true, highlight: false });
        let mut highlighted =
            fixtures::new_ad(user, "highlighted", Promotion { boost: false, highlight: true });
        let plain_new = fixtures::new_ad(user, "new plain", Promotion::default());
        boosted.status = AdStatus::Approved;
        highlighted.status = AdStatus::Approved;

        for ad in [&plain_old, &boosted, &highlighted, &plain_new] {
            db.insert_ad(ad, None).unwrap();
        }

        let titles: Vec<String> = listing(&db).into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["highlighted", "boosted", "new plain", "old plain"]);
    }

    #[test]
    fn search_filters_and_escapes() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "search@example.so");

        let mut cheap = fixtures::new_ad(user, "iPhone 100% original", Promotion::default());
        cheap.price = 50.0;
        let mut car = fixtures::new_ad(user, "Toyota Vitz", Promotion::default());
        car.category = "vehicles".into();
        car.region = "Nairobi".into();
        car.price = 4000.0;
        db.insert_ad(&cheap, None).unwrap();
        db.insert_ad(&car, None).unwrap();

        let by_text = db
            .list_public_ads(&AdFilter { text: Some("IPHONE".into()), limit: 50, ..Default::default() })
            .unwrap();
        assert_eq!(by_text.len(), 1);

        let wildcard = db
            .list_public_ads(&AdFilter { text: Some("%".into()), limit: 50, ..Default::default() })
            .unwrap();
        assert_eq!(wildcard.len(), 1, "literal % only matches the iPhone ad");

        let by_region = db
            .list_public_ads(&AdFilter {
                category: Some("vehicles".into()),
                region: Some("Nairobi".into()),
                min_price: Some(1000.0),
                max_price: Some(5000.0),
                limit: 50,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_region.len(), 1);
        assert_eq!(by_region[0].title, "Toyota Vitz");
    }

    #[test]
    fn transition_requires_expected_status() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "mod@example.so");
        let (ad, _) = db
            .insert_ad(&fixtures::new_ad(user, "Sofa", Promotion { boost: true, highlight: true }), None)
            .unwrap();

        let rejected = db.transition_ad(ad.id, AdStatus::Pending, AdStatus::Rejected).unwrap();
        assert_eq!(rejected.unwrap().status, AdStatus::Rejected);
        assert!(db.transition_ad(ad.id, AdStatus::Pending, AdStatus::Approved).unwrap().is_none());
        assert!(listing(&db).is_empty());
    }

    #[test]
    fn delete_is_hard() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "del@example.so");
        let (ad, _) = db.insert_ad(&fixtures::new_ad(user, "Goat", Promotion::default()), None).unwrap();
        assert!(db.delete_ad(ad.id).unwrap());
        assert!(db.get_ad(ad.id).unwrap().is_none());
        assert!(!db.delete_ad(ad.id).unwrap());
    }
}

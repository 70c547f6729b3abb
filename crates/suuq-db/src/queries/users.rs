use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use suuq_types::models::{Profile, User};

use super::{OptionalExt, parse_at, uuid_at};
use crate::Database;
use crate::models::{NewAccount, ProfileUpdate, UserRow};

pub(crate) const PROFILE_COLUMNS: &str = "p.user_id, p.email, p.shop_name, p.shop_region, p.phone, \
     p.has_shop, p.shop_setup_completed, p.subscription_plan, p.ad_count, p.created_at, p.updated_at";

pub(crate) fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: uuid_at(row, 0)?,
        email: row.get(1)?,
        shop_name: row.get(2)?,
        shop_region: row.get(3)?,
        phone: row.get(4)?,
        has_shop: row.get(5)?,
        shop_setup_completed: row.get(6)?,
        subscription_plan: parse_at(row, 7)?,
        ad_count: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    // -- Accounts --

    /// Create the identity and its free profile together.
    pub fn create_account(&self, account: &NewAccount<'_>) -> Result<()> {
        let now = Utc::now();
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![account.id.to_string(), account.email, account.password_hash, now],
            )?;
            tx.execute(
                "INSERT INTO profiles (user_id, email, subscription_plan, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![
                    account.id.to_string(),
                    account.email,
                    account.plan.as_str(),
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserRow {
                        id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?1",
                [id.to_string()],
                |row| {
                    Ok(User {
                        id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.to_string(), user_id.to_string(), Utc::now(), expires_at],
            )?;
            Ok(())
        })
    }

    /// True while the session exists, belongs to `user_id` and has not expired.
    pub fn session_is_active(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM sessions WHERE id = ?1 AND user_id = ?2 AND expires_at > ?3",
                    rusqlite::params![id.to_string(), user_id.to_string(), Utc::now()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn delete_session(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])?;
            Ok(n > 0)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }

    /// Apply shop setup. Shop fields are cleared when `has_shop` is false.
    pub fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let (shop_name, shop_region) = if update.has_shop {
            (update.shop_name.as_deref(), update.shop_region.as_deref())
        } else {
            (None, None)
        };

        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE profiles
                 SET has_shop = ?2, shop_name = ?3, shop_region = ?4, phone = ?5,
                     shop_setup_completed = 1, updated_at = ?6
                 WHERE user_id = ?1",
                rusqlite::params![
                    user_id.to_string(),
                    update.has_shop,
                    shop_name,
                    shop_region,
                    update.phone.as_deref(),
                    Utc::now()
                ],
            )?;
            if n == 0 {
                return Ok(None);
            }
            query_profile(conn, user_id)
        })
    }

    #[cfg(test)]
    pub(crate) fn set_plan(
        &self,
        user_id: Uuid,
        plan: suuq_types::models::SubscriptionPlan,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE profiles SET subscription_plan = ?2, updated_at = ?3 WHERE user_id = ?1",
                rusqlite::params![user_id.to_string(), plan.as_str(), Utc::now()],
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM profiles p ORDER BY p.created_at DESC, p.rowid DESC",
                PROFILE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_profile(conn: &Connection, user_id: Uuid) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles p WHERE p.user_id = ?1", PROFILE_COLUMNS);
    conn.query_row(&sql, [user_id.to_string()], profile_from_row)
        .optional()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::queries::fixtures;
    use suuq_types::models::SubscriptionPlan;

    #[test]
    fn account_gets_free_profile() {
        let db = fixtures::db();
        let id = fixtures::account(&db, "hodan@example.so");

        let user = db.get_user_by_email("hodan@example.so").unwrap().unwrap();
        assert_eq!(user.id, id);

        let profile = db.get_profile(id).unwrap().unwrap();
        assert_eq!(profile.subscription_plan, SubscriptionPlan::Free);
        assert_eq!(profile.ad_count, 0);
        assert!(!profile.shop_setup_completed);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = fixtures::db();
        fixtures::account(&db, "dup@example.so");
        let again = db.create_account(&NewAccount {
            id: Uuid::new_v4(),
            email: "dup@example.so",
            password_hash: "hash",
            plan: SubscriptionPlan::Free,
        });
        assert!(again.is_err());
    }

    #[test]
    fn sessions_expire_and_revoke() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "s@example.so");

        let live = Uuid::new_v4();
        db.create_session(live, user, Utc::now() + Duration::days(1)).unwrap();
        assert!(db.session_is_active(live, user).unwrap());
        assert!(!db.session_is_active(live, Uuid::new_v4()).unwrap());

        let stale = Uuid::new_v4();
        db.create_session(stale, user, Utc::now() - Duration::seconds(1)).unwrap();
        assert!(!db.session_is_active(stale, user).unwrap());

        assert!(db.delete_session(live).unwrap());
        assert!(!db.session_is_active(live, user).unwrap());
    }

    #[test]
    fn shop_fields_cleared_without_shop() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "shop@example.so");

        let profile = db
            .update_profile(
                user,
                &ProfileUpdate {
                    has_shop: true,
                    shop_name: Some("Xamar Electronics".into()),
                    shop_region: Some("Banaadir".into()),
                    phone: Some("+252615555555".into()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(profile.shop_name.as_deref(), Some("Xamar Electronics"));
        assert!(profile.shop_setup_completed);

        let profile = db
            .update_profile(
                user,
                &ProfileUpdate {
                    has_shop: false,
                    shop_name: Some("ignored".into()),
                    shop_region: None,
                    phone: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(profile.shop_name, None);
        assert!(!profile.has_shop);
    }
}

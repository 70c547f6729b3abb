use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::uuid_at;
use crate::Database;

impl Database {
    /// Clear boost and highlight on ads whose promotion window has passed.
    pub fn expire_promotions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE ads SET is_boosted = 0, is_highlighted = 0, updated_at = ?1
                 WHERE boost_expires_at IS NOT NULL
                   AND boost_expires_at < ?1
                   AND (is_boosted = 1 OR is_highlighted = 1)",
                [now],
            )?;
            Ok(n)
        })
    }

    /// Drop `pro` users back to `free` once their latest approved
    /// subscription has run out. A pro upgrade payment confirmed after that
    /// approval has no end date and keeps the user on `pro`. Returns the
    /// downgraded users.
    pub fn expire_subscriptions(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        self.with_tx(|tx| {
            let mut stmt = tx.prepare(
                "SELECT p.user_id FROM profiles p
                 JOIN (SELECT user_id,
                              MAX(subscription_expires_at) AS latest,
                              MAX(approved_at) AS last_approved
                       FROM admin_approvals
                       WHERE status = 'approved' AND subscription_expires_at IS NOT NULL
                       GROUP BY user_id) s ON s.user_id = p.user_id
                 WHERE p.subscription_plan = 'pro' AND s.latest < ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM payment_approvals pa
                       WHERE pa.user_id = p.user_id
                         AND pa.payment_type = 'pro_upgrade'
                         AND pa.status = 'confirmed'
                         AND pa.updated_at > s.last_approved)",
            )?;
            let expired = stmt
                .query_map([now], |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(stmt);

            for user_id in &expired {
                tx.execute(
                    "UPDATE profiles SET subscription_plan = 'free', updated_at = ?2
                     WHERE user_id = ?1 AND subscription_plan = 'pro'",
                    rusqlite::params![user_id.to_string(), now],
                )?;
            }
            Ok(expired)
        })
    }
}

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use suuq_types::api::{ApprovalReview, PaymentReview};
use suuq_types::models::{
    AdminApproval, ApprovalStatus, PaymentApproval, PaymentStatus, PaymentType, SubscriptionPlan,
};

use super::{OptionalExt, opt_uuid_at, parse_at, uuid_at};
use crate::Database;
use crate::models::{DecisionOutcome, NewApproval, NewPayment};

const PAYMENT_COLUMNS: &str = "pa.id, pa.user_id, pa.ad_id, pa.payment_type, pa.amount, \
     pa.payment_phone, pa.payment_confirmed_by_user, pa.shop_name, pa.status, pa.admin_notes, \
     pa.created_at, pa.updated_at";

const APPROVAL_COLUMNS: &str = "aa.id, aa.user_id, aa.approval_type, aa.amount, aa.notes, \
     aa.status, aa.approved_by, aa.approved_at, aa.subscription_duration, \
     aa.subscription_expires_at, aa.created_at, aa.updated_at";

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentApproval> {
    Ok(PaymentApproval {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        ad_id: opt_uuid_at(row, 2)?,
        payment_type: parse_at(row, 3)?,
        amount: row.get(4)?,
        payment_phone: row.get(5)?,
        payment_confirmed_by_user: row.get(6)?,
        shop_name: row.get(7)?,
        status: parse_at(row, 8)?,
        admin_notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn approval_from_row(row: &Row<'_>) -> rusqlite::Result<AdminApproval> {
    Ok(AdminApproval {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        approval_type: row.get(2)?,
        amount: row.get(3)?,
        notes: row.get(4)?,
        status: parse_at(row, 5)?,
        approved_by: opt_uuid_at(row, 6)?,
        approved_at: row.get(7)?,
        subscription_duration: row.get(8)?,
        subscription_expires_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Record a payment the user says they already sent. Used on its own and
/// inside the ad insert transaction.
pub(crate) fn insert_payment(conn: &Connection, payment: &NewPayment) -> Result<PaymentApproval> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO payment_approvals (id, user_id, ad_id, payment_type, amount, payment_phone,
                                        payment_confirmed_by_user, shop_name, status,
                                        created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, 'pending', ?8, ?8)",
        rusqlite::params![
            payment.id.to_string(),
            payment.user_id.to_string(),
            payment.ad_id.map(|id| id.to_string()),
            payment.payment_type.as_str(),
            payment.amount,
            payment.payment_phone,
            payment.shop_name,
            now,
        ],
    )?;
    query_payment(conn, payment.id)?
        .ok_or_else(|| anyhow::anyhow!("Payment {} vanished after insert", payment.id))
}

fn query_payment(conn: &Connection, id: Uuid) -> Result<Option<PaymentApproval>> {
    let sql = format!("SELECT {} FROM payment_approvals pa WHERE pa.id = ?1", PAYMENT_COLUMNS);
    conn.query_row(&sql, [id.to_string()], payment_from_row)
        .optional()
}

fn query_approval(conn: &Connection, id: Uuid) -> Result<Option<AdminApproval>> {
    let sql = format!("SELECT {} FROM admin_approvals aa WHERE aa.id = ?1", APPROVAL_COLUMNS);
    conn.query_row(&sql, [id.to_string()], approval_from_row)
        .optional()
}

impl Database {
    // -- Payments --

    pub fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentApproval> {
        self.with_conn(|conn| insert_payment(conn, payment))
    }

    pub fn get_payment(&self, id: Uuid) -> Result<Option<PaymentApproval>> {
        self.with_conn(|conn| query_payment(conn, id))
    }

    /// All payments with the payer's e-mail and shop, newest first.
    pub fn list_payment_reviews(&self) -> Result<Vec<PaymentReview>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, p.email, p.shop_name
                 FROM payment_approvals pa
                 LEFT JOIN profiles p ON p.user_id = pa.user_id
                 ORDER BY pa.created_at DESC, pa.rowid DESC",
                PAYMENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PaymentReview {
                        payment: payment_from_row(row)?,
                        payer_email: row.get(12)?,
                        payer_shop_name: row.get(13)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_payments_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentApproval>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM payment_approvals pa WHERE pa.user_id = ?1
                 ORDER BY pa.created_at DESC, pa.rowid DESC",
                PAYMENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], payment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Settle a pending payment. A confirmed pro upgrade raises the payer to
    /// `pro` in the same transaction; admins keep their plan. Returns `None`
    /// when the payment is missing or already decided.
    pub fn decide_payment(
        &self,
        id: Uuid,
        status: PaymentStatus,
        admin_notes: &str,
    ) -> Result<Option<DecisionOutcome<PaymentApproval>>> {
        let now = Utc::now();
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE payment_approvals SET status = ?2, admin_notes = ?3, updated_at = ?4
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id.to_string(), status.as_str(), admin_notes, now],
            )?;
            if n == 0 {
                return Ok(None);
            }

            let Some(payment) = query_payment(tx, id)? else {
                return Ok(None);
            };

            let plan_upgraded = if status == PaymentStatus::Confirmed
                && payment.payment_type == PaymentType::ProUpgrade
            {
                upgrade_to_pro(tx, payment.user_id, now)?
            } else {
                false
            };

            Ok(Some(DecisionOutcome { record: payment, plan_upgraded }))
        })
    }

    // -- Subscription approvals --

    pub fn insert_approval(&self, approval: &NewApproval) -> Result<AdminApproval> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_approvals (id, user_id, approval_type, amount, notes, status,
                                              subscription_duration, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?7)",
                rusqlite::params![
                    approval.id.to_string(),
                    approval.user_id.to_string(),
                    approval.approval_type,
                    approval.amount,
                    approval.notes,
                    approval.subscription_duration,
                    now,
                ],
            )?;
            query_approval(conn, approval.id)?
                .ok_or_else(|| anyhow::anyhow!("Approval {} vanished after insert", approval.id))
        })
    }

    pub fn get_approval(&self, id: Uuid) -> Result<Option<AdminApproval>> {
        self.with_conn(|conn| query_approval(conn, id))
    }

    /// Pending subscription requests with the requester's contact details,
    /// oldest first so the queue is worked in order.
    pub fn list_pending_approvals(&self) -> Result<Vec<ApprovalReview>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, p.email, p.shop_name, p.phone
                 FROM admin_approvals aa
                 LEFT JOIN profiles p ON p.user_id = aa.user_id
                 WHERE aa.status = 'pending'
                 ORDER BY aa.created_at ASC, aa.rowid ASC",
                APPROVAL_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ApprovalReview {
                        approval: approval_from_row(row)?,
                        requester_email: row.get(12)?,
                        requester_shop_name: row.get(13)?,
                        requester_phone: row.get(14)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_approvals_by_user(&self, user_id: Uuid) -> Result<Vec<AdminApproval>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM admin_approvals aa WHERE aa.user_id = ?1
                 ORDER BY aa.created_at DESC, aa.rowid DESC",
                APPROVAL_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], approval_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Decide a pending subscription request. Approval stamps the reviewer,
    /// sets the expiry from the requested duration and raises the plan.
    pub fn decide_approval(
        &self,
        id: Uuid,
        status: ApprovalStatus,
        admin_id: Uuid,
    ) -> Result<Option<DecisionOutcome<AdminApproval>>> {
        let now = Utc::now();
        self.with_tx(|tx| {
            let Some(current) = query_approval(tx, id)? else {
                return Ok(None);
            };
            let approved = status == ApprovalStatus::Approved;
            let expires_at =
                approved.then(|| subscription_expiry(now, current.subscription_duration));

            let n = tx.execute(
                "UPDATE admin_approvals
                 SET status = ?2, approved_by = ?3, approved_at = ?4,
                     subscription_expires_at = COALESCE(?5, subscription_expires_at),
                     updated_at = ?4
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![
                    id.to_string(),
                    status.as_str(),
                    admin_id.to_string(),
                    now,
                    expires_at
                ],
            )?;
            if n == 0 {
                return Ok(None);
            }

            let plan_upgraded = if approved {
                upgrade_to_pro(tx, current.user_id, now)?
            } else {
                false
            };
            let Some(approval) = query_approval(tx, id)? else {
                return Ok(None);
            };

            Ok(Some(DecisionOutcome { record: approval, plan_upgraded }))
        })
    }
}

fn subscription_expiry(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days.max(1))
}

/// Raise a profile to `pro`. Admin profiles are left alone.
fn upgrade_to_pro(conn: &Connection, user_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let n = conn.execute(
        "UPDATE profiles SET subscription_plan = ?2, updated_at = ?3
         WHERE user_id = ?1 AND subscription_plan <> ?4",
        rusqlite::params![
            user_id.to_string(),
            SubscriptionPlan::Pro.as_str(),
            now,
            SubscriptionPlan::Admin.as_str()
        ],
    )?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn pro_upgrade(user_id: Uuid) -> NewPayment {
        NewPayment {
            id: Uuid::new_v4(),
            user_id,
            ad_id: None,
            payment_type: PaymentType::ProUpgrade,
            amount: 10.0,
            payment_phone: "+254757872221".into(),
            shop_name: None,
        }
    }

    fn plan_of(db: &Database, user: Uuid) -> SubscriptionPlan {
        db.get_profile(user).unwrap().unwrap().subscription_plan
    }

    #[test]
    fn confirming_pro_upgrade_raises_plan_once() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "payer@example.so");
        let payment = db.insert_payment(&pro_upgrade(user)).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        let outcome = db
            .decide_payment(payment.id, PaymentStatus::Confirmed, "Payment verified and approved")
            .unwrap()
            .unwrap();
        assert!(outcome.plan_upgraded);
        assert_eq!(outcome.record.status, PaymentStatus::Confirmed);
        assert_eq!(plan_of(&db, user), SubscriptionPlan::Pro);

        // A second admin acting on the same record loses.
        let again = db
            .decide_payment(payment.id, PaymentStatus::Rejected, "Payment rejected")
            .unwrap();
        assert!(again.is_none());
        assert_eq!(
            db.get_payment(payment.id).unwrap().unwrap().status,
            PaymentStatus::Confirmed
        );
    }

    #[test]
    fn rejected_payment_keeps_plan() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "nope@example.so");
        let payment = db.insert_payment(&pro_upgrade(user)).unwrap();

        let outcome = db
            .decide_payment(payment.id, PaymentStatus::Rejected, "Payment rejected")
            .unwrap()
            .unwrap();
        assert!(!outcome.plan_upgraded);
        assert_eq!(plan_of(&db, user), SubscriptionPlan::Free);
    }

    #[test]
    fn admin_plan_is_never_lowered() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "boss@example.so");
        db.set_plan(user, SubscriptionPlan::Admin).unwrap();
        let payment = db.insert_payment(&pro_upgrade(user)).unwrap();

        db.decide_payment(payment.id, PaymentStatus::Confirmed, "ok").unwrap().unwrap();
        assert_eq!(plan_of(&db, user), SubscriptionPlan::Admin);
    }

    #[test]
    fn approving_subscription_sets_expiry_and_plan() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "sub@example.so");
        let admin = fixtures::account(&db, "admin@example.so");
        let request = db
            .insert_approval(&NewApproval {
                id: Uuid::new_v4(),
                user_id: user,
                approval_type: "subscription".into(),
                amount: Some(10.0),
                notes: None,
                subscription_duration: 30,
            })
            .unwrap();

        let pending = db.list_pending_approvals().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].requester_email.as_deref(), Some("sub@example.so"));

        let outcome = db
            .decide_approval(request.id, ApprovalStatus::Approved, admin)
            .unwrap()
            .unwrap();
        let approval = outcome.record;
        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert_eq!(approval.approved_by, Some(admin));
        let expires = approval.subscription_expires_at.unwrap();
        let days = (expires - approval.approved_at.unwrap()).num_days();
        assert_eq!(days, 30);
        assert_eq!(plan_of(&db, user), SubscriptionPlan::Pro);

        assert!(db.list_pending_approvals().unwrap().is_empty());
        assert!(db
            .decide_approval(request.id, ApprovalStatus::Rejected, admin)
            .unwrap()
            .is_none());
    }

    #[test]
    fn payment_reviews_carry_payer() {
        let db = fixtures::db();
        let user = fixtures::account(&db, "review@example.so");
        db.insert_payment(&pro_upgrade(user)).unwrap();

        let reviews = db.list_payment_reviews().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].payer_email.as_deref(), Some("review@example.so"));
        assert_eq!(db.list_payments_by_user(user).unwrap().len(), 1);
    }
}

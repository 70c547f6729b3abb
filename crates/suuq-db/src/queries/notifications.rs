use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use suuq_types::models::{Notification, NotificationKind};

use super::{opt_uuid_at, parse_at, uuid_at};
use crate::Database;

fn notification_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: parse_at(row, 4)?,
        read: row.get(5)?,
        related_id: opt_uuid_at(row, 6)?,
        created_at: row.get(7)?,
    })
}

impl Database {
    pub fn insert_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<Uuid>,
    ) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            kind,
            read: false,
            related_id,
            created_at: Utc::now(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, title, message, kind, read, related_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
                rusqlite::params![
                    notification.id.to_string(),
                    notification.user_id.to_string(),
                    notification.title,
                    notification.message,
                    notification.kind.as_str(),
                    notification.related_id.map(|id| id.to_string()),
                    notification.created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(notification)
    }

    pub fn list_notifications(&self, user_id: Uuid, limit: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, message, kind, read, related_id, created_at
                 FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string(), limit], notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    /// Mark one of the user's notifications read. False if it is not theirs.
    pub fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                [id.to_string(), user_id.to_string()],
            )?;
            Ok(n > 0)
        })
    }

    pub fn mark_all_read(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user_id.to_string()],
            )?;
            Ok(n)
        })
    }
}

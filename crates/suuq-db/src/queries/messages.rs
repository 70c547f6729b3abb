use anyhow::Result;
use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use suuq_types::models::Message;

use super::{parse_at, uuid_at};
use crate::Database;
use crate::models::ConversationRow;

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.receiver_id, m.ad_id, m.message, m.created_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_at(row, 0)?,
        sender_id: uuid_at(row, 1)?,
        receiver_id: uuid_at(row, 2)?,
        ad_id: uuid_at(row, 3)?,
        message: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        ad_id: Uuid,
        text: &str,
    ) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            ad_id,
            message: text.to_string(),
            created_at: Utc::now(),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, ad_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    message.id.to_string(),
                    message.sender_id.to_string(),
                    message.receiver_id.to_string(),
                    message.ad_id.to_string(),
                    message.message,
                    message.created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(message)
    }

    /// Every message the user sent or received, newest first, joined with
    /// the ad and the other participant's profile. Grouping into
    /// conversations happens in the caller.
    pub fn list_conversation_rows(&self, user_id: Uuid) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, a.title, a.price, a.currency, p.shop_name, p.email
                 FROM messages m
                 JOIN ads a ON a.id = m.ad_id
                 LEFT JOIN profiles p ON p.user_id =
                     CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(ConversationRow {
                        message: message_from_row(row)?,
                        ad_title: row.get(6)?,
                        ad_price: row.get(7)?,
                        ad_currency: parse_at(row, 8)?,
                        other_shop_name: row.get(9)?,
                        other_email: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages between two users about one ad, oldest first.
    pub fn thread(&self, ad_id: Uuid, user_a: Uuid, user_b: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages m
                 WHERE m.ad_id = ?1
                   AND ((m.sender_id = ?2 AND m.receiver_id = ?3)
                     OR (m.sender_id = ?3 AND m.receiver_id = ?2))
                 ORDER BY m.created_at ASC, m.rowid ASC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    [ad_id.to_string(), user_a.to_string(), user_b.to_string()],
                    message_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

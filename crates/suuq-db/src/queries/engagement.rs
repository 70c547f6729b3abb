use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use suuq_types::api::RatingSummary;

use super::ads::{AD_COLUMNS, AD_COLUMN_COUNT, ad_from_row};
use super::{OptionalExt, uuid_at};
use crate::Database;
use crate::models::{CommentRow, FavoriteRow};

impl Database {
    // -- Favorites --

    /// Flip the (user, ad) favorite. Returns whether the ad is now favorited.
    pub fn toggle_favorite(&self, ad_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_tx(|tx| {
            let removed = tx.execute(
                "DELETE FROM favorites WHERE ad_id = ?1 AND user_id = ?2",
                [ad_id.to_string(), user_id.to_string()],
            )?;
            if removed > 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO favorites (id, ad_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    ad_id.to_string(),
                    user_id.to_string(),
                    Utc::now()
                ],
            )?;
            Ok(true)
        })
    }

    pub fn is_favorite(&self, ad_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM favorites WHERE ad_id = ?1 AND user_id = ?2",
                    [ad_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// The user's favorites with their ads, most recently favorited first.
    pub fn list_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, f.id, f.created_at
                 FROM favorites f
                 JOIN ads a ON a.id = f.ad_id
                 WHERE f.user_id = ?1
                   AND (a.status IN ('approved', 'out_of_stock') OR a.user_id = ?1)
                 ORDER BY f.created_at DESC, f.rowid DESC",
                AD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(FavoriteRow {
                        ad: ad_from_row(row)?,
                        id: uuid_at(row, AD_COLUMN_COUNT)?,
                        created_at: row.get(AD_COLUMN_COUNT + 1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, ad_id: Uuid, user_id: Uuid, comment: &str) -> Result<CommentRow> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, ad_id, user_id, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    ad_id.to_string(),
                    user_id.to_string(),
                    comment,
                    Utc::now()
                ],
            )?;
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            conn.query_row(&sql, [id.to_string()], comment_from_row)
                .map_err(Into::into)
        })
    }

    /// Comments on an ad, newest first, with the commenter's shop and e-mail.
    pub fn list_comments(&self, ad_id: Uuid) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.ad_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([ad_id.to_string()], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Ratings --

    /// Insert or replace this user's rating of the ad, then recompute.
    pub fn upsert_rating(&self, ad_id: Uuid, user_id: Uuid, rating: u8) -> Result<RatingSummary> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO ratings (id, ad_id, user_id, rating, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(ad_id, user_id) DO UPDATE SET rating = excluded.rating",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    ad_id.to_string(),
                    user_id.to_string(),
                    rating,
                    Utc::now()
                ],
            )?;
            query_rating_summary(tx, ad_id)
        })
    }

    pub fn rating_summary(&self, ad_id: Uuid) -> Result<RatingSummary> {
        self.with_conn(|conn| query_rating_summary(conn, ad_id))
    }
}

const COMMENT_SELECT: &str = "SELECT c.id, c.ad_id, c.user_id, c.comment, c.created_at, \
     p.shop_name, p.email FROM comments c LEFT JOIN profiles p ON p.user_id = c.user_id";

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: uuid_at(row, 0)?,
        ad_id: uuid_at(row, 1)?,
        user_id: uuid_at(row, 2)?,
        comment: row.get(3)?,
        created_at: row.get(4)?,
        shop_name: row.get(5)?,
        email: row.get(6)?,
    })
}

fn query_rating_summary(conn: &rusqlite::Connection, ad_id: Uuid) -> Result<RatingSummary> {
    let summary = conn.query_row(
        "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM ratings WHERE ad_id = ?1",
        [ad_id.to_string()],
        |row| {
            Ok(RatingSummary {
                average: row.get(0)?,
                count: row.get(1)?,
            })
        },
    )?;
    Ok(summary)
}

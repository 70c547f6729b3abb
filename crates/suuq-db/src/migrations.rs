use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE TABLE profiles (
                user_id               TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                email                 TEXT NOT NULL,
                shop_name             TEXT,
                shop_region           TEXT,
                phone                 TEXT,
                has_shop              INTEGER NOT NULL DEFAULT 0,
                shop_setup_completed  INTEGER NOT NULL DEFAULT 0,
                subscription_plan     TEXT NOT NULL DEFAULT 'free',
                ad_count              INTEGER NOT NULL DEFAULT 0,
                created_at            TEXT NOT NULL,
                updated_at            TEXT NOT NULL
            );

            CREATE TABLE ads (
                id                TEXT PRIMARY KEY,
                user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title             TEXT NOT NULL,
                description       TEXT NOT NULL,
                price             REAL NOT NULL,
                currency          TEXT NOT NULL DEFAULT 'USD',
                category          TEXT NOT NULL,
                region            TEXT NOT NULL,
                phone             TEXT NOT NULL,
                shop_name         TEXT NOT NULL,
                image_urls        TEXT NOT NULL DEFAULT '[]',
                cv_url            TEXT,
                job_title         TEXT,
                salary            TEXT,
                experience        TEXT,
                brand             TEXT,
                model             TEXT,
                year              TEXT,
                condition         TEXT,
                status            TEXT NOT NULL DEFAULT 'pending',
                is_boosted        INTEGER NOT NULL DEFAULT 0,
                is_highlighted    INTEGER NOT NULL DEFAULT 0,
                boost_expires_at  TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE INDEX idx_ads_listing
                ON ads(status, is_highlighted DESC, is_boosted DESC, created_at DESC);
            CREATE INDEX idx_ads_user ON ads(user_id, created_at);

            CREATE TABLE messages (
                id           TEXT PRIMARY KEY,
                sender_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                ad_id        TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                message      TEXT NOT NULL,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_messages_sender ON messages(sender_id, created_at);
            CREATE INDEX idx_messages_receiver ON messages(receiver_id, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                ad_id       TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                comment     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_ad ON comments(ad_id, created_at);

            CREATE TABLE ratings (
                id          TEXT PRIMARY KEY,
                ad_id       TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                created_at  TEXT NOT NULL,
                UNIQUE(ad_id, user_id)
            );

            CREATE TABLE favorites (
                id          TEXT PRIMARY KEY,
                ad_id       TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(ad_id, user_id)
            );

            CREATE TABLE payment_approvals (
                id                         TEXT PRIMARY KEY,
                user_id                    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                ad_id                      TEXT REFERENCES ads(id) ON DELETE SET NULL,
                payment_type               TEXT NOT NULL,
                amount                     REAL NOT NULL,
                payment_phone              TEXT NOT NULL,
                payment_confirmed_by_user  INTEGER NOT NULL DEFAULT 0,
                shop_name                  TEXT,
                status                     TEXT NOT NULL DEFAULT 'pending',
                admin_notes                TEXT,
                created_at                 TEXT NOT NULL,
                updated_at                 TEXT NOT NULL
            );

            CREATE INDEX idx_payments_user ON payment_approvals(user_id, created_at);

            CREATE TABLE admin_approvals (
                id                       TEXT PRIMARY KEY,
                user_id                  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                approval_type            TEXT NOT NULL,
                amount                   REAL,
                notes                    TEXT,
                status                   TEXT NOT NULL DEFAULT 'pending',
                approved_by              TEXT,
                approved_at              TEXT,
                subscription_duration    INTEGER NOT NULL DEFAULT 30,
                subscription_expires_at  TEXT,
                created_at               TEXT NOT NULL,
                updated_at               TEXT NOT NULL
            );

            CREATE INDEX idx_approvals_user ON admin_approvals(user_id, created_at);

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                message     TEXT NOT NULL,
                kind        TEXT NOT NULL,
                read        INTEGER NOT NULL DEFAULT 0,
                related_id  TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;

use suuq_db::Database;
use suuq_gateway::Dispatcher;
use suuq_types::events::GatewayEvent;
use suuq_types::i18n::Text;
use suuq_types::models::NotificationKind;
use suuq_types::pricing::Pricing;

use crate::error::ApiError;
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub pricing: Pricing,
    pub storage: Storage,
    /// Base URL uploads are served from, without a trailing slash.
    pub public_url: String,
    /// Lowercased e-mails that register with the admin plan.
    pub admin_emails: HashSet<String>,
}

impl AppStateInner {
    /// Run blocking database work off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })?
            .map_err(ApiError::Internal)
    }

    /// Store a notification and push it to the user's open connections.
    /// Failures are logged; the action that caused them already happened.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: Text,
        message: Text,
        related_id: Option<Uuid>,
    ) {
        let title = bilingual(&title);
        let message = bilingual(&message);
        let inserted = self
            .db(move |db| db.insert_notification(user_id, kind, &title, &message, related_id))
            .await;

        match inserted {
            Ok(notification) => {
                self.dispatcher
                    .send_to_user(user_id, GatewayEvent::NotificationCreate { notification })
                    .await;
            }
            Err(e) => warn!("Failed to notify {} ({}): {}", user_id, kind, e),
        }
    }

    pub fn public_file_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_url, bucket, path)
    }
}

/// Notifications are stored once for a reader whose language is unknown,
/// so both languages go into the row.
fn bilingual(text: &Text) -> String {
    if text.so == text.en {
        text.so.to_string()
    } else {
        format!("{} / {}", text.so, text.en)
    }
}

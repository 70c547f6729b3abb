use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use suuq_db::Database;

/// Background task that ends lapsed promotions and subscriptions.
///
/// Each tick clears boost and highlight flags past `boost_expires_at`, then
/// returns `pro` profiles whose latest approved subscription ran out to
/// `free`, unless a pro upgrade was paid for after it.
pub async fn run_expiry_loop(db: Arc<Database>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db = db.clone();
        let swept = tokio::task::spawn_blocking(move || sweep(&db)).await;
        match swept {
            Ok(Ok((promotions, downgraded))) => {
                if promotions > 0 || downgraded > 0 {
                    info!(
                        "Expiry: ended {} promotions, downgraded {} subscriptions",
                        promotions, downgraded
                    );
                }
            }
            Ok(Err(e)) => warn!("Expiry sweep error: {}", e),
            Err(e) => warn!("Expiry sweep task failed: {}", e),
        }
    }
}

fn sweep(db: &Database) -> anyhow::Result<(usize, usize)> {
    let now = Utc::now();
    let promotions = db.expire_promotions(now)?;
    let downgraded = db.expire_subscriptions(now)?;
    for user_id in &downgraded {
        info!("Subscription for {} expired, back on the free plan", user_id);
    }
    Ok((promotions, downgraded.len()))
}

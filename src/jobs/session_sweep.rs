use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::{db::DbPool, error::AppResult};

/// Delete PayPal sessions older than `ttl`, consumed and abandoned alike.
/// A buyer completing payment after the window will find no session and the
/// success callback fails.
pub async fn sweep_expired(pool: &DbPool, ttl: Duration) -> AppResult<u64> {
    let result = sqlx::query(
        "DELETE FROM paypal_sessions WHERE created_at < now() - make_interval(secs => $1)",
    )
    .bind(ttl.as_secs_f64())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Run the sweep on a fixed interval until the process exits. Failures are
/// logged and the loop keeps going.
pub fn spawn(pool: DbPool, ttl: Duration, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; skip the first tick
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sweep_expired(&pool, ttl).await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::info!(removed, "swept expired paypal sessions");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "session sweep failed");
                }
            }
        }
    })
}

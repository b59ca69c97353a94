use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};

use crate::application::use_cases::subscription::SubscriptionUseCases;

/// Periodically demote subscriptions whose billing period has elapsed.
///
/// The sweep is idempotent: a record demoted on one tick is not picked up
/// again, and a missed tick is only a delayed demotion, never a wrong one.
pub async fn run_expiry_sweep_loop(
    subscription_use_cases: Arc<SubscriptionUseCases>,
    poll_interval: Duration,
) {
    let mut ticker = interval(poll_interval);

    info!(
        "Subscription expiry sweep started (polling every {}s)",
        poll_interval.as_secs()
    );

    loop {
        ticker.tick().await;

        match subscription_use_cases.expire_due(Utc::now()).await {
            Ok(0) => {}
            Ok(count) => {
                info!(count, "Demoted expired subscriptions");
            }
            Err(e) => {
                error!(error = ?e, "Expiry sweep failed; will retry on next tick");
            }
        }
    }
}

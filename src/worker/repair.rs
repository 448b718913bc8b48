use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use crate::services::{consistency, EntityStore};

/// Periodically rebuilds every user's pending list from the task records.
/// Failures are logged and retried on the next tick.
pub async fn repair_process(store: Arc<dyn EntityStore>, period: Duration) {
    tracing::info!("Repair worker started, running every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match consistency::rebuild_pending(store.as_ref()).await {
            Ok(report) if report.users_repaired > 0 => tracing::info!(
                "Repair pass fixed {} of {} users",
                report.users_repaired,
                report.users_checked
            ),
            Ok(report) => tracing::debug!("Repair pass checked {} users", report.users_checked),
            Err(e) => tracing::error!("Repair pass failed: {}", e),
        }
    }
}

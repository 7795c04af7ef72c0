use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::service::LifecycleService;

/// Periodically starts contests flagged `auto_start` whose start time has passed.
pub async fn run_auto_start_sweeper(service: Arc<LifecycleService>, scan_interval: Duration) {
    info!(
        scan_interval_secs = scan_interval.as_secs(),
        "Starting contest auto-start sweeper"
    );

    let mut interval = tokio::time::interval(scan_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match service.auto_start_due_contests().await {
            Ok(0) => {}
            Ok(started) => info!(started, "Auto-start sweep finished"),
            Err(e) => error!(error = %e, "Auto-start sweep failed"),
        }
    }
}

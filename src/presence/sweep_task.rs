use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use super::tracker::PresenceTracker;

/// Starts the background task that periodically sweeps stale presence entries
#[instrument(skip(tracker))]
pub async fn start_sweep_task(tracker: Arc<PresenceTracker>, sweep_interval: Duration) {
    info!(
        sweep_interval_secs = sweep_interval.as_secs(),
        "Starting presence sweep background task"
    );

    let mut tick = interval(sweep_interval);

    loop {
        tick.tick().await;

        let evicted = tracker.sweep().await;
        if evicted > 0 {
            info!(evicted = evicted, "Presence sweep completed");
        }
    }
}

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use super::registry::RoomRegistry;

/// Configuration for the room reaper task
#[derive(Debug, Clone)]
pub struct ReapConfig {
    /// How often to scan for idle rooms
    pub reap_interval: Duration,
    /// How long a room must sit empty before deletion
    pub grace_period: Duration,
}

impl Default for ReapConfig {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_secs(10 * 60),
            grace_period: Duration::from_secs(30 * 60),
        }
    }
}

/// Starts the background task that periodically reaps idle rooms
#[instrument(skip(registry))]
pub async fn start_reap_task(registry: Arc<RoomRegistry>, config: ReapConfig) {
    info!(
        reap_interval_secs = config.reap_interval.as_secs(),
        grace_period_secs = config.grace_period.as_secs(),
        "Starting room reaper background task"
    );

    let mut tick = interval(config.reap_interval);

    loop {
        tick.tick().await;

        let reaped = registry.reap_idle(config.grace_period).await;
        if reaped > 0 {
            info!(reaped = reaped, "Room reaper pass completed");
        }
    }
}

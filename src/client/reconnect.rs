use rand::Rng;
use std::time::Duration;

/// What the adapter does when a room's stream ends unexpectedly
///
/// Reconnection storms are worse than a quiet gap, so the default is to
/// stay disconnected until the next subscribe or an explicit retry call.
#[derive(Debug, Clone)]
pub enum ReconnectPolicy {
    /// Log and wait for the next subscribe or a manual retry trigger
    ManualRetry,
    /// Exponential backoff with jitter, capped at `cap`,
    /// giving up after `max_attempts`
    Backoff {
        base: Duration,
        cap: Duration,
        max_attempts: u32,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::ManualRetry
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (0-based);
    /// `None` means do not retry automatically.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match self {
            ReconnectPolicy::ManualRetry => None,
            ReconnectPolicy::Backoff {
                base,
                cap,
                max_attempts,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let exponential = base.saturating_mul(1u32 << attempt.min(16));
                let capped = exponential.min(*cap);
                let jitter_ceiling = (capped.as_millis() as u64) / 4;
                let jitter = if jitter_ceiling == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=jitter_ceiling)
                };
                Some(capped + Duration::from_millis(jitter))
            }
        }
    }
}

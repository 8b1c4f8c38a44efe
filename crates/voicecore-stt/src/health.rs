//! Connection health classification and reconnect backoff (spec §4.4).

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded,
    Unhealthy,
}

pub fn classify(since_last_inbound: Duration) -> Health {
    if since_last_inbound < Duration::from_secs(15) {
        Health::Healthy
    } else if since_last_inbound < Duration::from_secs(30) {
        Health::Degraded
    } else {
        Health::Unhealthy
    }
}

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const BACKOFF_BASE_MS: u64 = 100;
const BACKOFF_CAP_MS: u64 = 2_000;

/// Exponential backoff delay for the given zero-indexed attempt number,
/// doubling from 100 ms and capped at 2 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(10));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_elapsed_time() {
        assert_eq!(classify(Duration::from_secs(5)), Health::Healthy);
        assert_eq!(classify(Duration::from_secs(20)), Health::Degraded);
        assert_eq!(classify(Duration::from_secs(31)), Health::Unhealthy);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(10), Duration::from_millis(BACKOFF_CAP_MS));
    }
}

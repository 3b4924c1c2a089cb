use std::time::Duration;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 30_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Cancelled or auto-reconnect disabled: leave everything as is.
    Skip,
    /// Schedule retry number `attempt` after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// Attempt ceiling reached.
    GiveUp,
}

/// `min(1000 * 2^attempt, 30000)` milliseconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let millis = 2u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(BASE_DELAY_MS))
        .map_or(MAX_DELAY_MS, |millis| millis.min(MAX_DELAY_MS));
    Duration::from_millis(millis)
}

/// Decide what to do after a transport failure, given the number of retries
/// already made since the last successful connection.
pub fn decide(attempt: u32, cancelled: bool, auto_reconnect: bool) -> ReconnectDecision {
    if cancelled || !auto_reconnect {
        return ReconnectDecision::Skip;
    }

    if attempt < MAX_RECONNECT_ATTEMPTS {
        let attempt = attempt + 1;
        ReconnectDecision::Retry {
            attempt,
            delay: backoff_delay(attempt),
        }
    } else {
        ReconnectDecision::GiveUp
    }
}

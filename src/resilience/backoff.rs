//! Exponential backoff with jitter, used when polling for receipts.

use rand::Rng;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter.
///
/// Attempt 0 is immediate. Jitter adds up to 10% on top of the capped delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Stateful poll schedule: starts at `base`, doubles up to `max`.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
}

impl PollBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base_ms = base.as_millis().max(1) as u64;
        Self {
            attempt: 0,
            base_ms,
            max_ms: (max.as_millis() as u64).max(base_ms),
        }
    }

    /// Delay before the next poll.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }

    #[test]
    fn test_poll_backoff_grows_and_caps() {
        let mut backoff = PollBackoff::new(Duration::from_millis(100), Duration::from_millis(400));
        let first = backoff.next_delay();
        let second = backoff.next_delay();
        assert!(first.as_millis() >= 100 && first.as_millis() < 110);
        assert!(second.as_millis() >= 200 && second.as_millis() < 220);

        for _ in 0..10 {
            assert!(backoff.next_delay().as_millis() < 440);
        }
        assert_eq!(backoff.attempts(), 12);
    }
}

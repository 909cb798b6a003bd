//! Backoff between driver cycles that found only transient work.

use std::time::Duration;

use crate::config::RetryPolicy;

/// Counts consecutive transient failures and hands out the next delay.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryTimer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay before the next retry; each call backs off further.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Back to the initial delay after progress was made.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backs_off_and_resets() {
        let mut timer = RetryTimer::new(RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(30),
            multiplier: 2.0,
        });
        assert_eq!(timer.next_delay(), Duration::from_millis(10));
        assert_eq!(timer.next_delay(), Duration::from_millis(20));
        assert_eq!(timer.next_delay(), Duration::from_millis(30));
        assert_eq!(timer.next_delay(), Duration::from_millis(30));
        assert_eq!(timer.attempts(), 4);

        timer.reset();
        assert_eq!(timer.next_delay(), Duration::from_millis(10));
    }
}

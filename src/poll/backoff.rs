//! Capped exponential backoff with a fixed attempt budget.

use std::time::Duration;

/// Result of requesting the next retry delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDelay {
    /// Wait this long before the next status check.
    Wait(Duration),
    /// The attempt budget is spent: stop, do not wait, do not retry.
    Exhausted,
}

/// Delay-sequence generator bounding how often and how long an async
/// condition is rechecked before giving up.
///
/// Defaults match the payment-confirmation poll: 5 s base, 60 s ceiling,
/// 20 attempts.
#[derive(Debug, Clone)]
pub struct BackoffPoller {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Default for BackoffPoller {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), Duration::from_secs(60), 20)
    }
}

impl BackoffPoller {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// Consume one attempt and return the delay before the next check.
    ///
    /// The doubling exponent is capped at 3 independently of `max_delay`, so
    /// with the defaults the sequence is 5 s, 10 s, 20 s, 40 s, 40 s, … and
    /// plateaus below the nominal 60 s ceiling. That plateau is intentional;
    /// `max_delay` still applies as a second cap for other parameters.
    pub fn next_delay(&mut self) -> NextDelay {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return NextDelay::Exhausted;
        }
        let exp = self.attempt.saturating_sub(1).min(3);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exp));
        NextDelay::Wait(delay.min(self.max_delay))
    }

    /// Whether the attempt budget has been spent.
    pub fn should_stop(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Attempts consumed so far (one per `next_delay` call).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Coarse progress in `0.0..=1.0` for a "still processing" indicator.
    pub fn progress(&self) -> f32 {
        if self.max_attempts == 0 {
            1.0
        } else {
            self.attempt as f32 / self.max_attempts as f32
        }
    }

    /// Zero the attempt counter; the fixed parameters are untouched.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

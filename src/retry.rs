//! Full-jitter exponential backoff for the Agent API HTTP client.
//!
//! The retry loop shares one deadline (`start_time`) across every attempt of
//! a single request: once the elapsed time reaches `max_retry_time` the
//! original error is surfaced rather than scheduling another sleep. This is
//! the canonical behaviour mandated for this client; it deliberately differs
//! from additive jitter (`base * 2^n ± 10%`), which is easy to reach for but
//! clusters retries more tightly around the mean and is worse at spreading
//! load after a correlated failure.

use crate::config::RateLimitRetryConfig;
use std::time::{Duration, Instant};

/// Tracks the shared deadline and attempt count for one logical request.
///
/// A fresh `RetryState` is created per `request()` call and is never reused
/// across requests — the retry count must not cross request boundaries.
pub struct RetryState {
    config: RateLimitRetryConfig,
    start_time: Instant,
    attempt: u32,
}

impl RetryState {
    pub fn new(config: RateLimitRetryConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            attempt: 0,
        }
    }

    /// Full-jitter delay for the current attempt: `floor(rand * min(base * 2^n, max_delay))`.
    fn compute_delay(&self) -> Duration {
        let raw = self.config.base_delay.as_millis() as f64 * 2f64.powi(self.attempt as i32);
        let capped = raw.min(self.config.max_delay.as_millis() as f64);
        let jittered = (rand::random::<f64>() * capped).floor().max(1.0);
        Duration::from_millis(jittered as u64)
    }

    /// Returns `Some(delay)` to sleep-and-retry, or `None` if the deadline
    /// has been exceeded and the caller should surface the original error.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.start_time.elapsed() >= self.config.max_retry_time {
            return None;
        }
        let delay = self.compute_delay();
        self.attempt += 1;
        Some(delay)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_max_delay() {
        let config = RateLimitRetryConfig {
            max_retry_time: Duration::from_secs(3600),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        };
        let mut state = RetryState::new(config);
        for _ in 0..20 {
            let delay = state.next_delay().unwrap();
            assert!(delay <= Duration::from_millis(5000));
            assert!(delay >= Duration::from_millis(1));
        }
    }

    #[test]
    fn deadline_exhausted_returns_none() {
        let config = RateLimitRetryConfig {
            max_retry_time: Duration::from_millis(0),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        let mut state = RetryState::new(config);
        assert!(state.next_delay().is_none());
    }

    #[test]
    fn attempt_count_increments_monotonically() {
        let config = RateLimitRetryConfig {
            max_retry_time: Duration::from_secs(3600),
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        };
        let mut state = RetryState::new(config);
        assert_eq!(state.attempt(), 0);
        state.next_delay();
        assert_eq!(state.attempt(), 1);
        state.next_delay();
        assert_eq!(state.attempt(), 2);
    }
}

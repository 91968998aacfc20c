//! Exponential backoff schedule for reconnect attempts

use std::time::Duration;

use crate::config::RetryConfig;

/// Retry bookkeeping: `delay = min(initial × multiplier^(attempt − 1),
/// ceiling)`, up to `max_attempts`. The counter resets on a successful
/// handshake.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            initial_ms: retry.initial_delay_ms,
            max_ms: retry.max_delay_ms,
            multiplier: retry.backoff_multiplier,
            max_attempts: retry.max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;

        let mut delay = self.initial_ms as f64;
        for _ in 1..self.attempt {
            delay *= self.multiplier;
            if delay >= self.max_ms as f64 {
                break;
            }
        }
        Some(Duration::from_millis(delay.min(self.max_ms as f64) as u64))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts made since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_backoff() -> Backoff {
        Backoff::new(&RetryConfig::default())
    }

    #[test]
    fn test_default_schedule() {
        let mut backoff = default_backoff();
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_monotone_and_bounded() {
        let mut backoff = default_backoff();
        let mut previous = Duration::ZERO;
        while let Some(delay) = backoff.next_delay() {
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(30_000));
            previous = delay;
        }
    }

    #[test]
    fn test_exhaustion() {
        let mut backoff = Backoff::new(&RetryConfig {
            max_attempts: 3,
            ..RetryConfig::default()
        });
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = default_backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_non_geometric_multiplier() {
        let mut backoff = Backoff::new(&RetryConfig {
            initial_delay_ms: 100,
            backoff_multiplier: 1.5,
            max_delay_ms: 1000,
            ..RetryConfig::default()
        });
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(150)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(225)));
    }
}

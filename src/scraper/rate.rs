//! Polite inter-request delays
//!
//! Before every page fetch the runner sleeps for a uniformly random
//! duration in `[min, max]`. Randomness avoids a fixed request cadence.

use std::time::Duration;

use rand::Rng;
use tracing::trace;

use crate::config::ScraperConfig;

#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    min_secs: f64,
    max_secs: f64,
}

impl DelayPolicy {
    /// Build a policy; an inverted range collapses to `min`
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = min_secs.max(0.0);
        let max_secs = max_secs.max(min_secs);
        Self { min_secs, max_secs }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.min_delay_secs, config.max_delay_secs)
    }

    /// No delay at all, for tests
    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Draw one delay from the configured range
    pub fn pick(&self) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs)
    }

    /// Sleep for one freshly drawn delay
    pub async fn wait(&self) {
        let delay = self.pick();
        if !delay.is_zero() {
            trace!(delay_ms = delay.as_millis() as u64, "rate limit sleep");
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::new(2.0, 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_stays_in_range() {
        let policy = DelayPolicy::new(0.5, 1.5);
        for _ in 0..100 {
            let d = policy.pick().as_secs_f64();
            assert!((0.5..=1.5).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn test_degenerate_range_is_constant() {
        let policy = DelayPolicy::new(2.0, 2.0);
        assert_eq!(policy.pick(), Duration::from_secs(2));
    }

    #[test]
    fn test_inverted_range_collapses_to_min() {
        let policy = DelayPolicy::new(3.0, 1.0);
        assert_eq!(policy.pick(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_none_policy_returns_immediately() {
        let started = std::time::Instant::now();
        DelayPolicy::none().wait().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}

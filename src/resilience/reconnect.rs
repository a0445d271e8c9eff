//! Fixed-delay, bounded reconnection schedule.

use std::time::Duration;

use crate::config::RealtimeConfig;

/// Reconnect schedule for the real-time client.
///
/// Every attempt waits the same delay. Once `max_attempts` have been handed
/// out the policy refuses further attempts until [`reset`](Self::reset) is
/// called after a successful open.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_delay_ms),
            config.max_reconnect_attempts,
        )
    }

    /// Claim the next attempt. Returns `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_until_exhausted() {
        let mut policy = ReconnectPolicy::default();

        for attempt in 1..=5 {
            assert_eq!(policy.next_delay(), Some(Duration::from_millis(3000)));
            assert_eq!(policy.attempts(), attempt);
        }
        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempts(), 5);
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 2);
        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert!(policy.next_delay().is_none());

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert!(!policy.is_exhausted());
        assert!(policy.next_delay().is_some());
    }

    #[test]
    fn test_zero_budget_never_reconnects() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(1), 0);
        assert!(policy.is_exhausted());
        assert!(policy.next_delay().is_none());
    }
}

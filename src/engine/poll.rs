//! Polling cadence
//!
//! [`Backoff`] decides how long to wait between status queries and when to
//! give up. It knows nothing about jobs; the orchestrator drives it.

use std::time::Duration;
use tokio::time::Instant;

/// Interval, growth and deadline for status polling
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay before the second query (default: 250ms)
    pub initial_interval: Duration,
    /// Upper bound on the delay between queries (default: 5s)
    pub max_interval: Duration,
    /// Multiplier applied to the delay after each wait (default: 2.0)
    pub backoff_factor: f64,
    /// Total time to keep polling (default: 120s)
    pub timeout: Duration,
    /// Consecutive transport failures tolerated before giving up (default: 3)
    pub max_transport_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            backoff_factor: 2.0,
            timeout: Duration::from_secs(120),
            max_transport_retries: 3,
        }
    }
}

impl PollPolicy {
    /// Constant interval, no growth
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            backoff_factor: 1.0,
            timeout,
            ..Self::default()
        }
    }

    /// Delay that follows `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return current.min(self.max_interval);
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Running state of one polling loop
#[derive(Debug)]
pub struct Backoff {
    policy: PollPolicy,
    started: Instant,
    next_delay: Duration,
    transport_failures: u32,
}

impl Backoff {
    pub fn new(policy: &PollPolicy) -> Self {
        Self {
            policy: policy.clone(),
            started: Instant::now(),
            next_delay: policy.initial_interval.min(policy.max_interval),
            transport_failures: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Delay the next [`wait`](Self::wait) will sleep for, before the deadline cap
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// Sleep until the next attempt is due.
    ///
    /// Returns `false` without sleeping once the timeout has passed. The last
    /// sleep is shortened so one final attempt lands on the deadline.
    pub async fn wait(&mut self) -> bool {
        let elapsed = self.started.elapsed();
        if elapsed >= self.policy.timeout {
            return false;
        }
        let delay = self.next_delay.min(self.policy.timeout - elapsed);
        tokio::time::sleep(delay).await;
        self.next_delay = self.policy.next_interval(self.next_delay);
        true
    }

    /// Count a retryable failure. Returns `false` once the retry budget is spent.
    pub fn record_failure(&mut self) -> bool {
        self.transport_failures += 1;
        self.transport_failures <= self.policy.max_transport_retries
    }

    /// A successful attempt resets the failure count
    pub fn record_success(&mut self) {
        self.transport_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_millis(250));
        assert_eq!(policy.max_interval, Duration::from_secs(5));
        assert_eq!(policy.timeout, Duration::from_secs(120));
        assert_eq!(policy.max_transport_retries, 3);
    }

    #[test]
    fn test_interval_grows_to_cap() {
        let policy = PollPolicy::default();
        let mut delay = policy.initial_interval;
        let mut seen = vec![delay];
        for _ in 0..6 {
            delay = policy.next_interval(delay);
            seen.push(delay);
        }
        assert_eq!(
            seen,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(5),
                Duration::from_secs(5),
            ]
        );
    }

    #[test]
    fn test_fixed_interval() {
        let policy = PollPolicy::fixed(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(
            policy.next_interval(Duration::from_millis(100)),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_degenerate_factor_does_not_shrink_or_panic() {
        let policy = PollPolicy {
            backoff_factor: f64::NAN,
            ..PollPolicy::default()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(1)),
            Duration::from_secs(1)
        );

        let policy = PollPolicy {
            backoff_factor: 1e300,
            ..PollPolicy::default()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(1)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_failure_budget() {
        let policy = PollPolicy {
            max_transport_retries: 2,
            ..PollPolicy::default()
        };
        let mut backoff = Backoff::new(&policy);
        assert!(backoff.record_failure());
        assert!(backoff.record_failure());
        assert!(!backoff.record_failure());

        backoff.record_success();
        assert!(backoff.record_failure());
    }

    #[tokio::test]
    async fn test_wait_stops_at_timeout() {
        let policy = PollPolicy::fixed(Duration::from_millis(5), Duration::from_millis(20));
        let mut backoff = Backoff::new(&policy);
        let mut waits = 0;
        while backoff.wait().await {
            waits += 1;
            assert!(waits < 100, "backoff never timed out");
        }
        assert!(waits >= 1);
        assert!(backoff.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_timeout_never_waits() {
        let policy = PollPolicy::fixed(Duration::from_millis(5), Duration::ZERO);
        let mut backoff = Backoff::new(&policy);
        assert!(!backoff.wait().await);
    }
}

//! Poll timing policy.
//!
//! Everything here is a pure function of the current interval, the deadline
//! and the time passed in, so it can be tested with fabricated instants.

use std::time::Duration;

use tokio::time::Instant;

/// Tunable polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Added to the interval each time the server answers `slow_down`.
    pub slow_down_increment: Duration,
    /// Consecutive failed polls tolerated before giving up.
    pub max_transport_retries: u32,
    /// Lower bound applied to the server's interval.
    pub minimum_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            slow_down_increment: Duration::from_secs(5),
            max_transport_retries: 3,
            minimum_interval: Duration::from_secs(1),
        }
    }
}

impl PollPolicy {
    /// Sets the `slow_down` increment.
    #[must_use]
    pub const fn slow_down_increment(mut self, increment: Duration) -> Self {
        self.slow_down_increment = increment;
        self
    }

    /// Sets the retry ceiling for failed polls.
    #[must_use]
    pub const fn max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    /// Sets the minimum polling interval.
    #[must_use]
    pub const fn minimum_interval(mut self, interval: Duration) -> Self {
        self.minimum_interval = interval;
        self
    }
}

/// When the next poll may happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Sleep until the given instant, then poll.
    WaitThen(Instant),
    /// The next poll would not land before the device code expires.
    DeadlineExceeded,
}

/// Applies a [`PollPolicy`] to concrete instants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollScheduler {
    policy: PollPolicy,
}

impl PollScheduler {
    /// Creates a scheduler for the given policy.
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Interval to start with, given the one the server asked for.
    #[must_use]
    pub fn initial_interval(&self, server_interval: Duration) -> Duration {
        server_interval.max(self.policy.minimum_interval)
    }

    /// Decides when to poll next.
    ///
    /// A poll that would land at or after `deadline` is never scheduled.
    #[must_use]
    pub fn next_poll(&self, current_interval: Duration, deadline: Instant, now: Instant) -> Schedule {
        match now.checked_add(current_interval) {
            Some(next) if next < deadline => Schedule::WaitThen(next),
            _ => Schedule::DeadlineExceeded,
        }
    }

    /// Interval after a `slow_down` answer.
    #[must_use]
    pub fn slowed_down(&self, current_interval: Duration) -> Duration {
        current_interval.saturating_add(self.policy.slow_down_increment)
    }

    /// Returns true once `consecutive_failures` exceeds the retry ceiling.
    #[must_use]
    pub const fn retries_exhausted(&self, consecutive_failures: u32) -> bool {
        consecutive_failures > self.policy.max_transport_retries
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.slow_down_increment, secs(5));
        assert_eq!(policy.max_transport_retries, 3);
        assert_eq!(policy.minimum_interval, secs(1));
    }

    #[test]
    fn test_wait_then() {
        let scheduler = PollScheduler::default();
        let start = Instant::now();
        let deadline = start + secs(30);

        assert_eq!(
            scheduler.next_poll(secs(5), deadline, start),
            Schedule::WaitThen(start + secs(5))
        );
        assert_eq!(
            scheduler.next_poll(secs(10), deadline, start + secs(15)),
            Schedule::WaitThen(start + secs(25))
        );
    }

    #[test]
    fn test_poll_landing_on_deadline_is_not_scheduled() {
        let scheduler = PollScheduler::default();
        let start = Instant::now();
        let deadline = start + secs(10);

        assert_eq!(
            scheduler.next_poll(secs(5), deadline, start + secs(5)),
            Schedule::DeadlineExceeded
        );
        assert_eq!(
            scheduler.next_poll(secs(5), deadline, start + secs(11)),
            Schedule::DeadlineExceeded
        );
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let scheduler = PollScheduler::default();
        let start = Instant::now();
        assert_eq!(
            scheduler.next_poll(Duration::MAX, start + secs(10), start),
            Schedule::DeadlineExceeded
        );
    }

    #[test]
    fn test_initial_interval_floor() {
        let scheduler = PollScheduler::default();
        assert_eq!(scheduler.initial_interval(secs(0)), secs(1));
        assert_eq!(scheduler.initial_interval(secs(5)), secs(5));

        let scheduler = PollScheduler::new(PollPolicy::default().minimum_interval(Duration::ZERO));
        assert_eq!(scheduler.initial_interval(secs(0)), Duration::ZERO);
    }

    #[test]
    fn test_slowed_down() {
        let scheduler = PollScheduler::default();
        assert_eq!(scheduler.slowed_down(secs(5)), secs(10));

        let scheduler =
            PollScheduler::new(PollPolicy::default().slow_down_increment(secs(2)));
        assert_eq!(scheduler.slowed_down(secs(5)), secs(7));
        assert_eq!(scheduler.slowed_down(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_retries_exhausted() {
        let scheduler = PollScheduler::new(PollPolicy::default().max_transport_retries(1));
        assert!(!scheduler.retries_exhausted(0));
        assert!(!scheduler.retries_exhausted(1));
        assert!(scheduler.retries_exhausted(2));

        let scheduler = PollScheduler::new(PollPolicy::default().max_transport_retries(0));
        assert!(scheduler.retries_exhausted(1));
    }

    proptest! {
        #[test]
        fn prop_scheduled_poll_lands_before_deadline(
            interval in 0u64..100_000,
            expires_in in 1u64..100_000,
            elapsed in 0u64..200_000,
        ) {
            let scheduler = PollScheduler::default();
            let start = Instant::now();
            let deadline = start + Duration::from_millis(expires_in);
            let now = start + Duration::from_millis(elapsed);
            let interval = Duration::from_millis(interval);

            match scheduler.next_poll(interval, deadline, now) {
                Schedule::WaitThen(next) => {
                    prop_assert!(next < deadline);
                    prop_assert!(next >= now);
                    prop_assert_eq!(next - now, interval);
                }
                Schedule::DeadlineExceeded => prop_assert!(now + interval >= deadline),
            }
        }
    }
}

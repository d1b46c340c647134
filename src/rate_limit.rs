use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Denied,
}

/// Allows one action per window for each client identity, measured from that
/// identity's last accepted action.
pub struct RateLimiter {
    window: TimeDelta,
    last_accepted: DashMap<String, DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            last_accepted: DashMap::new(),
        }
    }

    /// Accepts and records `now`, or denies without touching state. The entry
    /// lock is held across the check and the write, so two calls for the same
    /// identity cannot both be accepted.
    pub fn check_and_record(&self, identity: &str, now: DateTime<Utc>) -> RateLimitDecision {
        match self.last_accepted.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.signed_duration_since(*entry.get()) >= self.window {
                    entry.insert(now);
                    RateLimitDecision::Allowed
                } else {
                    RateLimitDecision::Denied
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                RateLimitDecision::Allowed
            }
        }
    }

    /// Drops identities whose window has already elapsed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, last| now.signed_duration_since(*last) < self.window);
        before.saturating_sub(self.last_accepted.len())
    }

    pub fn reset(&self) {
        self.last_accepted.clear();
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn one_action_per_window_per_identity() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert_eq!(limiter.check_and_record("x", at(0)), RateLimitDecision::Allowed);
        assert_eq!(limiter.check_and_record("y", at(0)), RateLimitDecision::Allowed);
        assert_eq!(limiter.check_and_record("x", at(30)), RateLimitDecision::Denied);
        assert_eq!(limiter.check_and_record("x", at(61)), RateLimitDecision::Allowed);
    }

    #[test]
    fn denial_does_not_extend_the_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        limiter.check_and_record("x", at(0));
        assert_eq!(limiter.check_and_record("x", at(59)), RateLimitDecision::Denied);
        assert_eq!(limiter.check_and_record("x", at(60)), RateLimitDecision::Allowed);
    }

    #[test]
    fn prune_only_removes_elapsed_entries() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        limiter.check_and_record("old", at(0));
        limiter.check_and_record("recent", at(50));
        assert_eq!(limiter.prune(at(70)), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.check_and_record("recent", at(70)), RateLimitDecision::Denied);

        limiter.reset();
        assert!(limiter.is_empty());
    }

    #[test]
    fn simultaneous_calls_accept_exactly_one() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check_and_record("x", at(0)))
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|decision| *decision == RateLimitDecision::Allowed)
            .count();
        assert_eq!(allowed, 1);
    }
}

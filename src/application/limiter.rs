//! Per-client rate limiting.
//!
//! The rate limiter keeps the instant of the last granted request for each
//! client identity and rejects requests that arrive before the configured
//! interval has elapsed.
//!
//! A grant can be handed back when the claim it admitted was turned away
//! before any transfer started, so the client may retry right away.
//!
//! Records are never evicted: the map grows with the number of distinct
//! clients seen for the lifetime of the process.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::domain::identity::ClientIdentity;
use crate::domain::policy::{GrantPolicy, GrantRecord, PolicyDecision};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A grant recorded by `RateLimiter::acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    identity: ClientIdentity,
    granted_at: Instant,
    previous: Option<Instant>,
}

impl Grant {
    /// The client that was granted.
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// When the grant was recorded.
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

/// Decides whether a client may claim again.
#[derive(Debug, Clone)]
pub struct RateLimiter<S>
where
    S: Storage<ClientIdentity, GrantRecord> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
    policy: GrantPolicy,
    metrics: Metrics,
}

impl<S> RateLimiter<S>
where
    S: Storage<ClientIdentity, GrantRecord> + Clone,
{
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `storage` - Where per-client records live
    /// * `clock` - Time source for grant instants
    /// * `policy` - The minimum-interval policy
    /// * `metrics` - Metrics tracker
    pub fn new(storage: S, clock: Arc<dyn Clock>, policy: GrantPolicy, metrics: Metrics) -> Self {
        Self {
            storage,
            clock,
            policy,
            metrics,
        }
    }

    /// Check whether `identity` may proceed, recording the grant if so.
    ///
    /// The check and the record update happen under the storage entry lock,
    /// so concurrent calls for the same identity cannot both be granted
    /// within one interval. A denied call leaves the record untouched.
    pub fn acquire(&self, identity: &ClientIdentity) -> Option<Grant> {
        let now = self.clock.now();
        let (decision, previous) =
            self.storage
                .with_entry_mut(identity.clone(), GrantRecord::new, |record| {
                    let previous = record.last_grant();
                    (self.policy.register(record, now), previous)
                });

        match decision {
            PolicyDecision::Allow => {
                self.metrics.record_allowed();
                Some(Grant {
                    identity: identity.clone(),
                    granted_at: now,
                    previous,
                })
            }
            PolicyDecision::Deny => {
                self.metrics.record_limited();
                tracing::debug!(client = %identity, "claim rate limited");
                None
            }
        }
    }

    /// Like `acquire`, discarding the grant.
    pub fn allow(&self, identity: &ClientIdentity) -> bool {
        self.acquire(identity).is_some()
    }

    /// Give `grant` back, restoring the client's previous record.
    ///
    /// Has no effect once a newer grant replaced it. Returns whether the
    /// record was restored.
    pub fn refund(&self, grant: Grant) -> bool {
        let restored = self.storage.with_entry_mut(
            grant.identity.clone(),
            GrantRecord::new,
            |record| record.revoke(grant.granted_at, grant.previous),
        );
        if restored {
            self.metrics.record_refunded();
            tracing::debug!(client = %grant.identity, "grant refunded");
        }
        restored
    }

    /// Instant of the last grant for `identity`, if it has ever been granted.
    pub fn last_grant(&self, identity: &ClientIdentity) -> Option<Instant> {
        self.storage
            .get_cloned(identity)
            .and_then(|record| record.last_grant())
    }

    /// Number of client identities ever granted.
    pub fn tracked_clients(&self) -> usize {
        self.storage.len()
    }

    /// The minimum interval between grants.
    pub fn interval(&self) -> Duration {
        self.policy.interval()
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::InMemoryRateLimiter;

    fn limiter(clock: Arc<MockClock>, interval: Duration) -> InMemoryRateLimiter {
        InMemoryRateLimiter::in_memory(clock, interval, Metrics::new())
    }

    #[test]
    fn test_first_request_allowed() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        assert!(limiter.allow(&client));
        assert_eq!(limiter.last_grant(&client), Some(clock.now()));
    }

    #[test]
    fn test_repeat_within_interval_denied_without_update() {
        let start = Instant::now();
        let clock = Arc::new(MockClock::new(start));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        assert!(limiter.allow(&client));
        clock.advance(Duration::from_secs(30));
        assert!(!limiter.allow(&client));

        assert_eq!(limiter.last_grant(&client), Some(start));
    }

    #[test]
    fn test_repeat_after_interval_allowed_and_updated() {
        let start = Instant::now();
        let clock = Arc::new(MockClock::new(start));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        assert!(limiter.allow(&client));
        clock.advance(Duration::from_secs(60));
        assert!(limiter.allow(&client));

        assert_eq!(
            limiter.last_grant(&client),
            Some(start + Duration::from_secs(60))
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let limiter = limiter(clock, Duration::from_secs(60));

        assert!(limiter.allow(&ClientIdentity::new("1.1.1.1")));
        assert!(limiter.allow(&ClientIdentity::new("2.2.2.2")));
        assert!(!limiter.allow(&ClientIdentity::new("1.1.1.1")));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_metrics_recorded() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let limiter = limiter(clock, Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        limiter.allow(&client);
        limiter.allow(&client);
        limiter.allow(&client);

        assert_eq!(limiter.metrics().requests_allowed(), 1);
        assert_eq!(limiter.metrics().requests_limited(), 2);
    }

    #[test]
    fn test_refund_lets_client_claim_again() {
        let start = Instant::now();
        let clock = Arc::new(MockClock::new(start));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        let grant = limiter.acquire(&client).unwrap();
        assert_eq!(grant.identity(), &client);
        assert_eq!(grant.granted_at(), start);
        assert!(limiter.refund(grant));
        assert_eq!(limiter.last_grant(&client), None);

        clock.advance(Duration::from_secs(1));
        assert!(limiter.allow(&client));
        assert_eq!(limiter.metrics().grants_refunded(), 1);
    }

    #[test]
    fn test_refund_restores_earlier_grant() {
        let start = Instant::now();
        let clock = Arc::new(MockClock::new(start));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        assert!(limiter.allow(&client));
        clock.advance(Duration::from_secs(60));
        let grant = limiter.acquire(&client).unwrap();

        assert!(limiter.refund(grant));
        assert_eq!(limiter.last_grant(&client), Some(start));
    }

    #[test]
    fn test_refund_after_newer_grant_is_ignored() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let limiter = limiter(clock.clone(), Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        let stale = limiter.acquire(&client).unwrap();
        clock.advance(Duration::from_secs(60));
        assert!(limiter.allow(&client));

        assert!(!limiter.refund(stale));
        assert_eq!(limiter.last_grant(&client), Some(clock.now()));
        assert_eq!(limiter.metrics().grants_refunded(), 0);
    }

    #[test]
    fn test_concurrent_same_identity_granted_once() {
        use std::thread;

        let clock = Arc::new(MockClock::new(Instant::now()));
        let limiter = limiter(clock, Duration::from_secs(60));
        let client = ClientIdentity::new("1.1.1.1");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                let client = client.clone();
                thread::spawn(move || limiter.allow(&client))
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(granted, 1);
    }
}

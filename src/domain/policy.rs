//! Grant policy: one payout per client per interval.

use std::time::{Duration, Instant};

/// Decision made by the grant policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The request may proceed
    Allow,
    /// The request arrived before the interval elapsed
    Deny,
}

impl PolicyDecision {
    /// Check if this decision is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    /// Check if this decision is Deny.
    pub fn is_deny(&self) -> bool {
        matches!(self, PolicyDecision::Deny)
    }
}

/// Last-grant bookkeeping for one client identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantRecord {
    last_grant: Option<Instant>,
}

impl GrantRecord {
    /// A record with no grant yet.
    pub fn new() -> Self {
        Self { last_grant: None }
    }

    /// Instant of the most recent grant, if any.
    pub fn last_grant(&self) -> Option<Instant> {
        self.last_grant
    }

    /// Undo the grant made at `granted_at`, putting back `previous`.
    ///
    /// Returns false and leaves the record alone when it no longer holds
    /// that grant.
    pub fn revoke(&mut self, granted_at: Instant, previous: Option<Instant>) -> bool {
        if self.last_grant != Some(granted_at) {
            return false;
        }
        self.last_grant = previous;
        true
    }
}

/// Minimum-interval policy.
///
/// A request is permitted iff the identity has never been granted, or at
/// least `interval` has passed since its last grant. Only permitted
/// requests update the record.
///
/// # Example
/// ```
/// use faucet_dispatch::{GrantPolicy, GrantRecord};
/// use std::time::{Duration, Instant};
///
/// let policy = GrantPolicy::new(Duration::from_secs(60));
/// let mut record = GrantRecord::new();
/// let now = Instant::now();
///
/// assert!(policy.register(&mut record, now).is_allow());
/// assert!(policy.register(&mut record, now + Duration::from_secs(59)).is_deny());
/// assert!(policy.register(&mut record, now + Duration::from_secs(60)).is_allow());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantPolicy {
    interval: Duration,
}

impl GrantPolicy {
    /// Create a policy with the given minimum interval between grants.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Policy with the interval expressed in minutes.
    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide on a request at `now`, recording the grant if permitted.
    pub fn register(&self, record: &mut GrantRecord, now: Instant) -> PolicyDecision {
        match record.last_grant {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                PolicyDecision::Deny
            }
            _ => {
                record.last_grant = Some(now);
                PolicyDecision::Allow
            }
        }
    }
}

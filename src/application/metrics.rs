//! Observability metrics for admission and dispatch.
//!
//! Counters are updated on every path through the faucet so operators can
//! see how much traffic is throttled, deferred or rejected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission and dispatch statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Requests that passed the rate limiter
    requests_allowed: AtomicU64,
    /// Requests denied by the rate limiter
    requests_limited: AtomicU64,
    /// Grants handed back after the claim was turned away
    grants_refunded: AtomicU64,
    /// Claims dispatched synchronously on the fast path
    claims_dispatched: AtomicU64,
    /// Claims deferred to the queue
    claims_queued: AtomicU64,
    /// Claims rejected because the queue was full
    claims_rejected: AtomicU64,
    /// Transfers that returned a transaction id
    transfers_succeeded: AtomicU64,
    /// Transfers that failed or timed out
    transfers_failed: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_allowed(&self) {
        self.inner.requests_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_limited(&self) {
        self.inner.requests_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refunded(&self) {
        self.inner.grants_refunded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.inner.claims_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.inner.claims_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.claims_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transfer(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.inner.transfers_succeeded
        } else {
            &self.inner.transfers_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests that passed the rate limiter.
    pub fn requests_allowed(&self) -> u64 {
        self.inner.requests_allowed.load(Ordering::Relaxed)
    }

    /// Requests denied by the rate limiter.
    pub fn requests_limited(&self) -> u64 {
        self.inner.requests_limited.load(Ordering::Relaxed)
    }

    /// Grants handed back to clients.
    pub fn grants_refunded(&self) -> u64 {
        self.inner.grants_refunded.load(Ordering::Relaxed)
    }

    /// Claims dispatched synchronously.
    pub fn claims_dispatched(&self) -> u64 {
        self.inner.claims_dispatched.load(Ordering::Relaxed)
    }

    /// Claims deferred to the queue.
    pub fn claims_queued(&self) -> u64 {
        self.inner.claims_queued.load(Ordering::Relaxed)
    }

    /// Claims rejected because the queue was full.
    pub fn claims_rejected(&self) -> u64 {
        self.inner.claims_rejected.load(Ordering::Relaxed)
    }

    /// Transfers that succeeded.
    pub fn transfers_succeeded(&self) -> u64 {
        self.inner.transfers_succeeded.load(Ordering::Relaxed)
    }

    /// Transfers that failed.
    pub fn transfers_failed(&self) -> u64 {
        self.inner.transfers_failed.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_allowed: self.requests_allowed(),
            requests_limited: self.requests_limited(),
            grants_refunded: self.grants_refunded(),
            claims_dispatched: self.claims_dispatched(),
            claims_queued: self.claims_queued(),
            claims_rejected: self.claims_rejected(),
            transfers_succeeded: self.transfers_succeeded(),
            transfers_failed: self.transfers_failed(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Requests that passed the rate limiter
    pub requests_allowed: u64,
    /// Requests denied by the rate limiter
    pub requests_limited: u64,
    /// Grants handed back to clients
    pub grants_refunded: u64,
    /// Claims dispatched synchronously
    pub claims_dispatched: u64,
    /// Claims deferred to the queue
    pub claims_queued: u64,
    /// Claims rejected because the queue was full
    pub claims_rejected: u64,
    /// Transfers that succeeded
    pub transfers_succeeded: u64,
    /// Transfers that failed
    pub transfers_failed: u64,
}

impl MetricsSnapshot {
    /// Fraction of rate-limiter decisions that were denials (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been seen.
    pub fn limited_rate(&self) -> f64 {
        let total = self.requests_allowed.saturating_add(self.requests_limited);
        if total == 0 {
            0.0
        } else {
            self.requests_limited as f64 / total as f64
        }
    }

    /// Total transfers attempted on either path.
    pub fn transfers_attempted(&self) -> u64 {
        self.transfers_succeeded.saturating_add(self.transfers_failed)
    }
}

//! Admission control for incoming claims.
//!
//! A claim that reaches the controller has already passed the rate limiter.
//! The controller then picks one of two paths:
//!
//! - **Fast path**: the queue is empty and the dispatch lock is free. The
//!   transfer runs right away and the caller gets the transaction id.
//! - **Busy path**: the queue has pending claims or a transfer is in
//!   flight. The claim is queued for the drain loop, or rejected when the
//!   queue is full. The caller never waits on the lock.
//!
//! The emptiness check and the lock attempt are not atomic together, so a
//! claim may occasionally take the busy path while the system was briefly
//! idle. That only costs latency: the drain loop attempts every queued
//! claim.

use crate::application::dispatcher::Dispatcher;
use crate::application::error::{ClaimError, ClaimOutcome};
use crate::application::lock::DispatchLock;
use crate::application::metrics::Metrics;
use crate::application::ports::TransferError;
use crate::application::queue::DispatchQueue;
use crate::domain::claim::ClaimRequest;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Request-handling entry point for claims.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    queue: Arc<DispatchQueue>,
    lock: DispatchLock,
    dispatcher: Arc<Dispatcher>,
    metrics: Metrics,
}

impl AdmissionController {
    /// Create a controller sharing `queue`, `lock` and `dispatcher` with the drain loop.
    pub fn new(
        queue: Arc<DispatchQueue>,
        lock: DispatchLock,
        dispatcher: Arc<Dispatcher>,
        metrics: Metrics,
    ) -> Self {
        Self {
            queue,
            lock,
            dispatcher,
            metrics,
        }
    }

    /// Serve one claim.
    ///
    /// On the fast path the transfer runs in its own task, so it completes
    /// (and releases the lock) even if the caller stops waiting. Its
    /// duration is bounded by the dispatcher's deadline.
    ///
    /// # Errors
    /// - `ClaimError::QueueFull` when busy and the queue has no room
    /// - `ClaimError::UnknownToken` when the symbol is not registered
    /// - `ClaimError::Transfer` when the fast-path transfer fails
    pub async fn handle_claim(&self, claim: ClaimRequest) -> Result<ClaimOutcome, ClaimError> {
        let guard = if self.queue.is_empty() {
            self.lock.try_acquire()
        } else {
            None
        };

        let Some(guard) = guard else {
            return self.defer(claim);
        };

        if let Err(err) = self.dispatcher.resolve(&claim) {
            self.lock.release(guard);
            warn!(destination = %claim.destination(), error = %err, "unknown token requested");
            return Err(err);
        }

        self.metrics.record_dispatched();
        let dispatcher = Arc::clone(&self.dispatcher);
        let lock = self.lock.clone();
        let task_claim = claim.clone();
        let task = tokio::spawn(async move {
            let result = dispatcher.dispatch(&task_claim, &guard).await;
            lock.release(guard);
            result
        });

        let result = match task.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(destination = %claim.destination(), error = %join_error, "dispatch task aborted");
                return Err(ClaimError::Transfer(TransferError::Rejected(
                    "dispatch task aborted".to_string(),
                )));
            }
        };

        match &result {
            Ok(tx) => info!(
                destination = %claim.destination(),
                symbol = claim.symbol().unwrap_or(""),
                tx_hash = %tx,
                "funded directly"
            ),
            Err(err) => error!(
                destination = %claim.destination(),
                symbol = claim.symbol().unwrap_or(""),
                error = %err,
                "failed to send transaction"
            ),
        }

        result.map(ClaimOutcome::Dispatched)
    }

    /// Busy path: queue the claim or reject it.
    fn defer(&self, claim: ClaimRequest) -> Result<ClaimOutcome, ClaimError> {
        match self.queue.try_enqueue(claim) {
            Ok(()) => {
                self.metrics.record_queued();
                info!(queue_len = self.queue.len(), "added to queue");
                Ok(ClaimOutcome::Queued)
            }
            Err(claim) => {
                self.metrics.record_rejected();
                warn!(
                    destination = %claim.destination(),
                    capacity = self.queue.capacity(),
                    "max queue capacity reached"
                );
                Err(ClaimError::QueueFull)
            }
        }
    }

    /// The shared overflow queue.
    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    /// The shared dispatch lock.
    pub fn lock(&self) -> &DispatchLock {
        &self.lock
    }

    /// The shared dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

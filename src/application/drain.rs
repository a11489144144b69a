//! Background drain of the overflow queue.
//!
//! On every tick the drain loop takes the dispatch lock (waiting for any
//! in-flight fast-path transfer), sends every queued claim in order, and
//! releases the lock. Failed transfers are logged and counted but never
//! re-queued; the requester already received an acknowledgement.

use crate::application::dispatcher::Dispatcher;
use crate::application::error::DispatchRecord;
use crate::application::lock::DispatchLock;
use crate::application::queue::DispatchQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Error returned when drain configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrainConfigError {
    /// Tick period must be greater than zero
    #[error("drain period must be greater than 0")]
    ZeroPeriod,
}

/// Configuration for the drain loop.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// How often the queue is checked
    pub period: Duration,
    /// Whether to drain whatever is left when shutting down
    pub drain_on_shutdown: bool,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            drain_on_shutdown: true,
        }
    }
}

impl DrainConfig {
    /// Create a drain config with the specified tick period.
    ///
    /// # Errors
    /// Returns `DrainConfigError::ZeroPeriod` if `period` is zero.
    pub fn new(period: Duration) -> Result<Self, DrainConfigError> {
        if period.is_zero() {
            return Err(DrainConfigError::ZeroPeriod);
        }
        Ok(Self {
            period,
            ..Self::default()
        })
    }

    /// Set whether remaining claims are drained on shutdown.
    pub fn with_drain_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_on_shutdown = drain;
        self
    }
}

/// Error returned when the drain task fails to stop cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// The drain task panicked
    #[error("drain task panicked: {0}")]
    TaskPanicked(String),
    /// The drain task was aborted before it could stop
    #[error("drain task was cancelled")]
    TaskCancelled,
}

/// Periodically empties the overflow queue.
#[derive(Debug, Clone)]
pub struct DrainLoop {
    queue: Arc<DispatchQueue>,
    lock: DispatchLock,
    dispatcher: Arc<Dispatcher>,
    config: DrainConfig,
}

impl DrainLoop {
    /// Create a drain loop over the queue, lock and dispatcher shared with admission.
    pub fn new(
        queue: Arc<DispatchQueue>,
        lock: DispatchLock,
        dispatcher: Arc<Dispatcher>,
        config: DrainConfig,
    ) -> Self {
        Self {
            queue,
            lock,
            dispatcher,
            config,
        }
    }

    /// Run one tick.
    ///
    /// Does nothing if the queue is empty. Otherwise waits for the dispatch
    /// lock and processes claims in FIFO order until the queue is empty,
    /// including claims enqueued while the drain is running.
    pub async fn drain_once(&self) -> Vec<DispatchRecord> {
        if self.queue.is_empty() {
            return Vec::new();
        }

        let guard = self.lock.acquire().await;
        let mut records = Vec::new();

        while let Some(claim) = self.queue.dequeue() {
            let result = self.dispatcher.dispatch(&claim, &guard).await;
            match &result {
                Ok(tx) => info!(
                    destination = %claim.destination(),
                    symbol = claim.symbol().unwrap_or(""),
                    tx_hash = %tx,
                    "consumed from queue"
                ),
                Err(err) => error!(
                    destination = %claim.destination(),
                    symbol = claim.symbol().unwrap_or(""),
                    error = %err,
                    "failed to handle transaction in the queue"
                ),
            }
            records.push(DispatchRecord { claim, result });
        }

        self.lock.release(guard);

        if !records.is_empty() {
            let failed = records.iter().filter(|r| !r.is_success()).count();
            info!(processed = records.len(), failed, "queue drained");
        }
        records
    }

    /// Spawn the drain loop on the current tokio runtime.
    ///
    /// The loop stops when `DrainHandle::shutdown` is called. A drain that
    /// has started always runs to completion; cancellation is only observed
    /// between ticks.
    pub fn start(self) -> DrainHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                self.drain_once().await;
            }

            if self.config.drain_on_shutdown && !self.queue.is_empty() {
                info!(remaining = self.queue.len(), "draining queue before shutdown");
                self.drain_once().await;
            }
        });

        DrainHandle { cancel, task }
    }

    /// Get the drain configuration.
    pub fn config(&self) -> &DrainConfig {
        &self.config
    }
}

/// Handle to a running drain loop.
///
/// Dropping the handle does not stop the loop; call `shutdown`.
#[derive(Debug)]
pub struct DrainHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DrainHandle {
    /// Stop the loop and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was aborted.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        self.cancel.cancel();
        self.task.await.map_err(|e| {
            if e.is_panic() {
                ShutdownError::TaskPanicked(e.to_string())
            } else {
                ShutdownError::TaskCancelled
            }
        })
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

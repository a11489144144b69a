//! Mock transfer sink for testing.

use crate::application::ports::{TransferError, TransferSink};
use crate::domain::claim::TransactionId;
use crate::domain::payout::NATIVE_DECIMALS;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One recorded call to `MockSink::transfer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    /// Destination passed to the sink
    pub destination: String,
    /// Amount in base units
    pub amount: u128,
}

/// Sink that records transfers and answers with sequential ids.
///
/// Clones share the same call log, so a test can keep one handle while the
/// faucet owns another. Also tracks the peak number of concurrent calls,
/// which lets tests assert that transfers were serialized.
#[derive(Debug, Clone)]
pub struct MockSink {
    sender: String,
    decimals: u32,
    delay: Duration,
    state: Arc<SinkState>,
}

#[derive(Debug, Default)]
struct SinkState {
    calls: Mutex<Vec<TransferCall>>,
    failures: Mutex<VecDeque<TransferError>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSink {
    /// Create a sink that sends from `sender`.
    pub fn new(sender: &str) -> Self {
        Self {
            sender: sender.to_string(),
            decimals: NATIVE_DECIMALS,
            delay: Duration::ZERO,
            state: Arc::new(SinkState::default()),
        }
    }

    /// Report `decimals` for the transferred currency.
    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Sleep for `delay` inside every transfer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the next transfer fail with `error`. Failures queue up in order.
    pub fn fail_next(&self, error: TransferError) {
        self.state.failures.lock().push_back(error);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<TransferCall> {
        self.state.calls.lock().clone()
    }

    /// Destinations of all calls made so far, in order.
    pub fn destinations(&self) -> Vec<String> {
        self.state
            .calls
            .lock()
            .iter()
            .map(|call| call.destination.clone())
            .collect()
    }

    /// Transfers currently running.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of transfers observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Counts one running transfer until dropped, even if the transfer future is.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let running = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(running, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransferSink for MockSink {
    fn sender(&self) -> &str {
        &self.sender
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    async fn transfer(
        &self,
        destination: &str,
        amount: u128,
    ) -> Result<TransactionId, TransferError> {
        let running = InFlight::enter(&self.state.in_flight, &self.state.max_in_flight);

        let seq = {
            let mut calls = self.state.calls.lock();
            calls.push(TransferCall {
                destination: destination.to_string(),
                amount,
            });
            calls.len()
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        drop(running);

        match self.state.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(TransactionId::new(format!("0xtx{}", seq))),
        }
    }
}

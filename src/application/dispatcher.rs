//! Sink resolution and bounded transfer execution.
//!
//! Both the synchronous admission path and the drain loop send payouts
//! through the dispatcher. Every call requires a `DispatchGuard`, so a
//! transfer can only run while the dispatch lock is held.

use crate::application::error::ClaimError;
use crate::application::lock::DispatchGuard;
use crate::application::metrics::Metrics;
use crate::application::ports::{TransferError, TransferSink};
use crate::application::registry::TokenRegistry;
use crate::domain::claim::{ClaimRequest, TransactionId};
use crate::domain::payout::Payout;
use std::sync::Arc;
use std::time::Duration;

/// Deadline for a single transfer call.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the sink for a claim and performs the transfer.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    native: Arc<dyn TransferSink>,
    tokens: Arc<TokenRegistry>,
    payout: Payout,
    timeout: Duration,
    metrics: Metrics,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// # Arguments
    /// * `native` - Sink for native-currency claims
    /// * `tokens` - Sinks for token claims
    /// * `payout` - Whole units paid per claim
    /// * `metrics` - Metrics tracker
    pub fn new(
        native: Arc<dyn TransferSink>,
        tokens: Arc<TokenRegistry>,
        payout: Payout,
        metrics: Metrics,
    ) -> Self {
        Self {
            native,
            tokens,
            payout,
            timeout: TRANSFER_TIMEOUT,
            metrics,
        }
    }

    /// Override the per-transfer deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sink that serves `claim`.
    ///
    /// # Errors
    /// Returns `ClaimError::UnknownToken` if the claim names an unregistered symbol.
    pub fn resolve(&self, claim: &ClaimRequest) -> Result<&Arc<dyn TransferSink>, ClaimError> {
        match claim.symbol() {
            None => Ok(&self.native),
            Some(symbol) => self
                .tokens
                .get(symbol)
                .ok_or_else(|| ClaimError::UnknownToken(symbol.to_string())),
        }
    }

    /// Send the payout for `claim`.
    ///
    /// The transfer is bounded by the dispatch deadline; expiry is reported
    /// as `TransferError::Timeout`. Unknown tokens fail before any transfer
    /// is attempted.
    pub async fn dispatch(
        &self,
        claim: &ClaimRequest,
        _held: &DispatchGuard,
    ) -> Result<TransactionId, ClaimError> {
        let sink = self.resolve(claim)?;
        let amount = self.payout.to_base_units(sink.decimals())?;

        let result = match tokio::time::timeout(
            self.timeout,
            sink.transfer(claim.destination(), amount),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(self.timeout)),
        };

        self.metrics.record_transfer(result.is_ok());
        Ok(result?)
    }

    /// The native-currency sink.
    pub fn native(&self) -> &Arc<dyn TransferSink> {
        &self.native
    }

    /// The token registry.
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Whole units paid per claim.
    pub fn payout(&self) -> Payout {
        self.payout
    }

    /// Per-transfer deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

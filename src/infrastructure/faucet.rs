//! Faucet assembly.
//!
//! `Faucet` owns one instance of every dispatch component and wires them so
//! that admission and the drain loop share the same queue, lock and
//! dispatcher. Build one with `Faucet::builder()`.

use crate::application::admission::AdmissionController;
use crate::application::dispatcher::{Dispatcher, TRANSFER_TIMEOUT};
use crate::application::drain::{DrainConfig, DrainConfigError, DrainHandle, DrainLoop};
use crate::application::error::{ClaimError, ClaimOutcome};
use crate::application::lock::DispatchLock;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, TransferSink};
use crate::application::queue::DispatchQueue;
use crate::application::registry::{DuplicateToken, TokenRegistry};
use crate::domain::claim::ClaimRequest;
use crate::domain::identity::{ClientIdentity, IdentityResolver};
use crate::domain::payout::Payout;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::{ConfigError, FaucetConfig};
use crate::infrastructure::storage::InMemoryRateLimiter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Error returned when building a faucet fails.
#[derive(Debug)]
pub enum BuildError {
    /// No sink for the native currency was supplied
    MissingNativeSink,
    /// Configuration validation failed
    Config(ConfigError),
    /// Two token sinks were registered under one symbol
    DuplicateToken(DuplicateToken),
    /// Drain configuration validation failed
    Drain(DrainConfigError),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::MissingNativeSink => write!(f, "a native transfer sink is required"),
            BuildError::Config(e) => write!(f, "configuration error: {}", e),
            BuildError::DuplicateToken(e) => write!(f, "token registry error: {}", e),
            BuildError::Drain(e) => write!(f, "drain configuration error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::MissingNativeSink => None,
            BuildError::Config(e) => Some(e),
            BuildError::DuplicateToken(e) => Some(e),
            BuildError::Drain(e) => Some(e),
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(e: ConfigError) -> Self {
        BuildError::Config(e)
    }
}

impl From<DuplicateToken> for BuildError {
    fn from(e: DuplicateToken) -> Self {
        BuildError::DuplicateToken(e)
    }
}

impl From<DrainConfigError> for BuildError {
    fn from(e: DrainConfigError) -> Self {
        BuildError::Drain(e)
    }
}

/// Public description of the faucet, served by the info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaucetInfo {
    /// Sending account
    pub account: String,
    /// Network name
    pub network: String,
    /// Whole units paid per claim, as a decimal string
    pub payout: String,
}

/// Builder for constructing a `Faucet`.
pub struct FaucetBuilder {
    config: FaucetConfig,
    native: Option<Arc<dyn TransferSink>>,
    tokens: Vec<(String, Arc<dyn TransferSink>)>,
    clock: Option<Arc<dyn Clock>>,
    transfer_timeout: Duration,
    drain_period: Duration,
    drain_on_shutdown: bool,
}

impl FaucetBuilder {
    fn new() -> Self {
        let drain = DrainConfig::default();
        Self {
            config: FaucetConfig::default(),
            native: None,
            tokens: Vec::new(),
            clock: None,
            transfer_timeout: TRANSFER_TIMEOUT,
            drain_period: drain.period,
            drain_on_shutdown: drain.drain_on_shutdown,
        }
    }

    /// Use `config` for capacity, payout, interval, network and proxy settings.
    pub fn with_config(mut self, config: FaucetConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sink for native-currency claims. Required.
    pub fn with_native_sink(mut self, sink: Arc<dyn TransferSink>) -> Self {
        self.native = Some(sink);
        self
    }

    /// Register a token sink under `symbol`.
    pub fn with_token(mut self, symbol: impl Into<String>, sink: Arc<dyn TransferSink>) -> Self {
        self.tokens.push((symbol.into(), sink));
        self
    }

    /// Use a custom clock for the rate limiter.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the per-transfer deadline.
    ///
    /// Default: 5 seconds
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set how often the drain loop checks the queue.
    ///
    /// Default: 1 second
    pub fn with_drain_period(mut self, period: Duration) -> Self {
        self.drain_period = period;
        self
    }

    /// Set whether queued claims are sent when the drain loop stops.
    ///
    /// Default: true
    pub fn with_drain_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_on_shutdown = drain;
        self
    }

    /// Build the faucet.
    ///
    /// # Errors
    /// Returns `BuildError` if no native sink was set, the configuration is
    /// invalid, or two tokens share a symbol.
    pub fn build(self) -> Result<Faucet, BuildError> {
        self.config.validate()?;
        let native = self.native.ok_or(BuildError::MissingNativeSink)?;
        let drain_config =
            DrainConfig::new(self.drain_period)?.with_drain_on_shutdown(self.drain_on_shutdown);

        let mut registry = TokenRegistry::new();
        for (symbol, sink) in self.tokens {
            registry.register(&symbol, sink)?;
        }

        let metrics = Metrics::new();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let limiter = InMemoryRateLimiter::in_memory(clock, self.config.interval, metrics.clone());

        let queue = Arc::new(
            DispatchQueue::new(self.config.queue_cap)
                .map_err(|_| ConfigError::ZeroQueueCapacity)?,
        );
        let lock = DispatchLock::new();
        let dispatcher = Arc::new(
            Dispatcher::new(
                native,
                Arc::new(registry),
                self.config.payout,
                metrics.clone(),
            )
            .with_timeout(self.transfer_timeout),
        );

        let admission = AdmissionController::new(
            Arc::clone(&queue),
            lock.clone(),
            Arc::clone(&dispatcher),
            metrics.clone(),
        );
        let drain = DrainLoop::new(queue, lock, dispatcher, drain_config);

        Ok(Faucet {
            limiter,
            admission,
            drain,
            resolver: IdentityResolver::new(self.config.proxy_count),
            network: self.config.network,
            metrics,
        })
    }
}

/// A fully wired faucet.
#[derive(Debug)]
pub struct Faucet {
    limiter: InMemoryRateLimiter,
    admission: AdmissionController,
    drain: DrainLoop,
    resolver: IdentityResolver,
    network: String,
    metrics: Metrics,
}

impl Faucet {
    /// Start building a faucet.
    pub fn builder() -> FaucetBuilder {
        FaucetBuilder::new()
    }

    /// Rate-limit `identity` and, if allowed, admit `claim`.
    ///
    /// A claim turned away before any transfer started (full queue, unknown
    /// token) hands the grant back, so the client can retry without
    /// waiting out the interval.
    ///
    /// # Errors
    /// `ClaimError::RateLimited` when the client claimed within the interval;
    /// otherwise whatever admission reports.
    pub async fn claim(
        &self,
        identity: &ClientIdentity,
        claim: ClaimRequest,
    ) -> Result<ClaimOutcome, ClaimError> {
        let Some(grant) = self.limiter.acquire(identity) else {
            return Err(ClaimError::RateLimited);
        };
        let result = self.admission.handle_claim(claim).await;
        if let Err(err) = &result {
            if err.refunds_grant() {
                self.limiter.refund(grant);
            }
        }
        result
    }

    /// Admit a claim that already passed the rate limiter.
    ///
    /// # Errors
    /// See `AdmissionController::handle_claim`.
    pub async fn admit(&self, claim: ClaimRequest) -> Result<ClaimOutcome, ClaimError> {
        self.admission.handle_claim(claim).await
    }

    /// Spawn the background drain loop.
    pub fn start_drain(&self) -> DrainHandle {
        self.drain.clone().start()
    }

    /// Description served by the info endpoint.
    pub fn info(&self) -> FaucetInfo {
        FaucetInfo {
            account: self.admission.dispatcher().native().sender().to_string(),
            network: self.network.clone(),
            payout: self.payout().to_string(),
        }
    }

    /// Whole units paid per claim.
    pub fn payout(&self) -> Payout {
        self.admission.dispatcher().payout()
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &InMemoryRateLimiter {
        &self.limiter
    }

    /// The admission controller.
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// The drain loop.
    pub fn drain(&self) -> &DrainLoop {
        &self.drain
    }

    /// Derives client identities from connection data.
    pub fn resolver(&self) -> IdentityResolver {
        self.resolver
    }

    /// Configured network name.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

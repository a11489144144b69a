//! # faucet-dispatch
//!
//! Admission control and single-flight transfer dispatch for a testnet faucet.
//!
//! A faucet pays a fixed amount to any address that asks, at most once per
//! client per interval. Every payout is an on-chain transaction from a single
//! sending account, and transactions from one account must not be built
//! concurrently. This crate provides the pieces that make that work under
//! load:
//!
//! - **Rate limiting**: one grant per client identity per interval, with the
//!   identity taken from the connection peer or a trusted proxy chain.
//! - **Single-flight dispatch**: a process-wide lock ensures at most one
//!   transfer is in flight.
//! - **Overflow queue**: claims that arrive while a transfer is running are
//!   queued (bounded) and sent by a background drain loop.
//! - **Ledger and HTTP adapters**: a JSON-RPC transfer sink and an axum router.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use faucet_dispatch::{Faucet, FaucetConfig, JsonRpcSink, RpcClient};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(RpcClient::new(reqwest::Client::new(), "http://localhost:8545"));
//! client.probe("goerli").await?;
//! let native = JsonRpcSink::native(client, "0x00000000000000000000000000000000000000aa")?;
//!
//! let faucet = Arc::new(
//!     Faucet::builder()
//!         .with_config(FaucetConfig::default())
//!         .with_native_sink(Arc::new(native))
//!         .build()?,
//! );
//!
//! let drain = faucet.start_drain();
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! let shutdown = CancellationToken::new();
//! faucet_dispatch::infrastructure::http::serve(listener, faucet, shutdown).await?;
//! drain.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Claim flow
//!
//! ```text
//! request ─► RateLimiter ──denied──► 429
//!               │
//!               ▼
//!      AdmissionController
//!        │ queue empty and lock free          │ otherwise
//!        ▼                                    ▼
//!   transfer now ─► tx hash           DispatchQueue ──full──► 503
//!                                             │
//!                                      DrainLoop (every tick)
//! ```
//!
//! Queued claims are acknowledged immediately; a failed queued transfer is
//! logged and counted but never retried or reported back.
//! A claim turned away before any transfer started (full queue, unknown
//! token, malformed request) gives the client's rate-limit grant back.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use faucet_dispatch::Faucet;
//! # fn show(faucet: &Faucet) {
//! let snapshot = faucet.metrics().snapshot();
//! println!("limited: {:.1}%", snapshot.limited_rate() * 100.0);
//! println!("queued: {}", snapshot.claims_queued);
//! println!("failed transfers: {}", snapshot.transfers_failed);
//! # }
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    claim::{ClaimRequest, InvalidClaim, TransactionId},
    identity::{ClientIdentity, IdentityResolver},
    payout::{AmountOverflow, Payout, NATIVE_DECIMALS},
    policy::{GrantPolicy, GrantRecord, PolicyDecision},
};

pub use application::{
    admission::AdmissionController,
    dispatcher::{Dispatcher, TRANSFER_TIMEOUT},
    drain::{DrainConfig, DrainConfigError, DrainHandle, DrainLoop, ShutdownError},
    error::{ClaimError, ClaimOutcome, DispatchRecord},
    limiter::{Grant, RateLimiter},
    lock::{DispatchGuard, DispatchLock},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Storage, TransferError, TransferSink},
    queue::{DispatchQueue, ZeroCapacity},
    registry::{DuplicateToken, TokenRegistry},
};

pub use infrastructure::{
    clock::SystemClock,
    config::{load_token_specs, ConfigError, FaucetConfig, TokenSpec},
    faucet::{BuildError, Faucet, FaucetBuilder, FaucetInfo},
    rpc_sink::{JsonRpcSink, RpcClient},
    storage::{InMemoryRateLimiter, RecordStorage, ShardedStorage},
};

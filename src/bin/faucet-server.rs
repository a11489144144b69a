//! Faucet HTTP server.
//!
//! Connects to a ledger node over JSON-RPC, registers the native currency
//! and any tokens from the token file, and serves the claim API.
//!
//! # Usage
//!
//! ```sh
//! faucet-server --wallet.provider http://localhost:8545 \
//!     --wallet.sender 0x00000000000000000000000000000000000000aa \
//!     --faucet.name goerli --faucet.amount 1 --faucet.minutes 1440
//! ```
//!
//! The server exposes:
//! - `POST /api/claim` - request a payout
//! - `GET /api/info` - faucet account, network and payout

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use faucet_dispatch::infrastructure::config::{
    DEFAULT_HTTP_PORT, DEFAULT_INTERVAL_MINUTES, DEFAULT_NETWORK, DEFAULT_QUEUE_CAP,
    DEFAULT_TOKENS_FILE,
};
use faucet_dispatch::infrastructure::http;
use faucet_dispatch::{
    load_token_specs, Faucet, FaucetConfig, JsonRpcSink, Payout, RpcClient, TransferSink,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "faucet-server", version)]
#[command(about = "Testnet faucet with rate limiting and single-flight dispatch")]
struct Args {
    /// HTTP port to listen on.
    #[arg(long = "httpport", default_value_t = DEFAULT_HTTP_PORT, env = "FAUCET_HTTP_PORT")]
    http_port: u16,

    /// Number of trusted reverse proxies in front of the faucet.
    #[arg(long = "proxycount", default_value_t = 0, env = "FAUCET_PROXY_COUNT")]
    proxy_count: usize,

    /// Maximum number of queued claims.
    #[arg(long = "queuecap", default_value_t = DEFAULT_QUEUE_CAP, env = "FAUCET_QUEUE_CAP")]
    queue_cap: usize,

    /// Whole units paid per claim.
    #[arg(long = "faucet.amount", default_value_t = 1, env = "FAUCET_AMOUNT")]
    amount: u64,

    /// Minutes a client must wait between claims.
    #[arg(long = "faucet.minutes", default_value_t = DEFAULT_INTERVAL_MINUTES, env = "FAUCET_MINUTES")]
    minutes: u64,

    /// Network name shown to users.
    #[arg(long = "faucet.name", default_value = DEFAULT_NETWORK, env = "FAUCET_NAME")]
    network: String,

    /// Token registry file.
    #[arg(long = "faucet.tokens", default_value = DEFAULT_TOKENS_FILE, env = "FAUCET_TOKENS")]
    tokens: PathBuf,

    /// JSON-RPC endpoint of the ledger node.
    #[arg(long = "wallet.provider", env = "WEB3_PROVIDER")]
    provider: String,

    /// Sending account, unlocked on the node.
    #[arg(long = "wallet.sender", env = "FAUCET_SENDER")]
    sender: String,
}

impl Args {
    fn faucet_config(&self) -> FaucetConfig {
        FaucetConfig {
            http_port: self.http_port,
            proxy_count: self.proxy_count,
            queue_cap: self.queue_cap,
            payout: Payout::new(self.amount),
            interval: Duration::from_secs(self.minutes.saturating_mul(60)),
            network: self.network.clone(),
            tokens_file: self.tokens.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faucet_dispatch=info,faucet_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = args.faucet_config();
    config.validate().context("invalid faucet configuration")?;

    let http_client = reqwest::Client::builder()
        .build()
        .context("failed to create HTTP client")?;
    let rpc = Arc::new(RpcClient::new(http_client, args.provider.clone()));
    rpc.probe(&config.network)
        .await
        .with_context(|| format!("cannot reach ledger node at {}", args.provider))?;

    let native = JsonRpcSink::native(Arc::clone(&rpc), &args.sender)
        .context("invalid sender address")?;
    let mut builder = Faucet::builder()
        .with_config(config.clone())
        .with_native_sink(Arc::new(native));

    let tokens = load_token_specs(&config.tokens_file).context("invalid token file")?;
    for token in tokens {
        let sink = JsonRpcSink::token(
            Arc::clone(&rpc),
            &args.sender,
            &token.contract_address,
            token.decimals,
        )
        .with_context(|| format!("invalid token {}", token.symbol))?;
        info!(symbol = %token.symbol, contract = %token.contract_address, "token registered");
        builder = builder.with_token(token.symbol, Arc::new(sink) as Arc<dyn TransferSink>);
    }

    let faucet = Arc::new(builder.build().context("failed to build faucet")?);
    let drain = faucet.start_drain();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let info = faucet.info();
    info!(
        %addr,
        account = %info.account,
        network = %info.network,
        payout = %info.payout,
        "faucet listening"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutting down");
                signal.cancel();
            }
            Err(err) => warn!(error = %err, "failed to listen for ctrl-c"),
        }
    });

    http::serve(listener, Arc::clone(&faucet), shutdown)
        .await
        .context("HTTP server failed")?;

    drain.shutdown().await.context("drain loop failed to stop")?;

    let stats = faucet.metrics().snapshot();
    info!(
        dispatched = stats.claims_dispatched,
        queued = stats.claims_queued,
        rejected = stats.claims_rejected,
        refunded = stats.grants_refunded,
        failed = stats.transfers_failed,
        "faucet stopped"
    );
    Ok(())
}

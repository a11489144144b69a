//! Faucet configuration and token file loading.
//!
//! The library never reads the environment; the binary parses flags and
//! environment variables into a `FaucetConfig` and hands it over.

use crate::domain::payout::{Payout, NATIVE_DECIMALS};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// Default overflow queue capacity.
pub const DEFAULT_QUEUE_CAP: usize = 100;
/// Default interval between grants to one client, in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 1440;
/// Default network name.
pub const DEFAULT_NETWORK: &str = "testnet";
/// Default token file path.
pub const DEFAULT_TOKENS_FILE: &str = "tokens.json";

/// Error returned when configuration is invalid.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Queue capacity must be positive
    #[error("queue capacity must be greater than 0")]
    ZeroQueueCapacity,
    /// Payout must be positive
    #[error("payout must be greater than 0")]
    ZeroPayout,
    /// Network name must not be empty
    #[error("network name must not be empty")]
    EmptyNetwork,
    /// Token file could not be read
    #[error("failed to read token file {}: {source}", .path.display())]
    TokenFileRead {
        /// Path of the token file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// Token file is not a valid token list
    #[error("failed to parse token file {}: {source}", .path.display())]
    TokenFileParse {
        /// Path of the token file
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
    /// Two tokens share a symbol
    #[error("duplicate token symbol {0:?}")]
    DuplicateToken(String),
    /// A token entry has an unusable contract address
    #[error("token {symbol:?} has an invalid contract address {address:?}")]
    InvalidContract {
        /// Token symbol
        symbol: String,
        /// Offending address
        address: String,
    },
    /// A token entry has an empty symbol
    #[error("token with contract {0:?} has an empty symbol")]
    EmptySymbol(String),
}

/// Runtime configuration of the faucet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetConfig {
    /// Port the HTTP surface listens on
    pub http_port: u16,
    /// Number of trusted reverse proxies in front of the service
    pub proxy_count: usize,
    /// Overflow queue capacity
    pub queue_cap: usize,
    /// Whole units paid per claim
    pub payout: Payout,
    /// Minimum time between two grants to one client; zero disables throttling
    pub interval: Duration,
    /// Network name reported by the info endpoint
    pub network: String,
    /// Path of the token registry file
    pub tokens_file: PathBuf,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            proxy_count: 0,
            queue_cap: DEFAULT_QUEUE_CAP,
            payout: Payout::new(1),
            interval: Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60),
            network: DEFAULT_NETWORK.to_string(),
            tokens_file: PathBuf::from(DEFAULT_TOKENS_FILE),
        }
    }
}

impl FaucetConfig {
    /// Check the configuration for values the faucet cannot run with.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_cap == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.payout.units() == 0 {
            return Err(ConfigError::ZeroPayout);
        }
        if self.network.trim().is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        Ok(())
    }
}

/// One entry of the token registry file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenSpec {
    /// Address of the token contract
    pub contract_address: String,
    /// Token decimals
    #[serde(default = "default_decimals", rename = "decimal")]
    pub decimals: u32,
    /// Ticker symbol claims refer to
    pub symbol: String,
}

fn default_decimals() -> u32 {
    NATIVE_DECIMALS
}

/// Parse a token list and check it for duplicates and unusable entries.
///
/// # Errors
/// Returns `ConfigError` for invalid JSON, empty symbols, empty or
/// malformed contract addresses, and symbols that repeat ignoring case.
pub fn parse_token_specs(path: &Path, json: &str) -> Result<Vec<TokenSpec>, ConfigError> {
    let specs: Vec<TokenSpec> =
        serde_json::from_str(json).map_err(|source| ConfigError::TokenFileParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut seen = HashSet::new();
    for token in &specs {
        let symbol = token.symbol.trim().to_lowercase();
        if symbol.is_empty() {
            return Err(ConfigError::EmptySymbol(token.contract_address.clone()));
        }
        let address = token.contract_address.trim();
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidContract {
                symbol: token.symbol.clone(),
                address: token.contract_address.clone(),
            });
        }
        if !seen.insert(symbol) {
            return Err(ConfigError::DuplicateToken(token.symbol.clone()));
        }
    }
    Ok(specs)
}

/// Load the token registry file.
///
/// A missing or unparseable file is logged and yields no tokens, so the
/// native currency stays available.
///
/// # Errors
/// Returns `ConfigError` only for well-formed files with conflicting or
/// unusable entries.
pub fn load_token_specs(path: &Path) -> Result<Vec<TokenSpec>, ConfigError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(source) => {
            let err = ConfigError::TokenFileRead {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "token file unavailable, serving native currency only");
            return Ok(Vec::new());
        }
    };

    match parse_token_specs(path, &json) {
        Err(err @ ConfigError::TokenFileParse { .. }) => {
            warn!(error = %err, "token file unreadable, serving native currency only");
            Ok(Vec::new())
        }
        other => other,
    }
}

//! Claim requests and transaction identifiers.
//!
//! A claim asks for a single payout to a destination address, optionally
//! denominated in a registered token instead of the native currency.

use std::fmt;

/// A request for one payout.
///
/// The destination is never empty and the symbol, when present, is stored
/// lower-cased so it can be looked up in the token registry directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimRequest {
    destination: String,
    symbol: Option<String>,
}

/// Reason a claim could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidClaim {
    /// The destination address was empty or whitespace.
    #[error("destination address is required")]
    MissingDestination,
    /// The destination address contains characters that cannot appear in an address.
    #[error("destination address {0:?} is malformed")]
    MalformedDestination(String),
}

impl ClaimRequest {
    /// Build a claim from raw request input.
    ///
    /// Surrounding whitespace is trimmed from both fields. An empty symbol
    /// means the native currency.
    ///
    /// # Errors
    /// Returns `InvalidClaim` if the destination is empty or contains
    /// whitespace or the `:` separator.
    pub fn new(destination: &str, symbol: Option<&str>) -> Result<Self, InvalidClaim> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(InvalidClaim::MissingDestination);
        }
        if destination
            .chars()
            .any(|c| c.is_whitespace() || c == ':' || c == ',')
        {
            return Err(InvalidClaim::MalformedDestination(destination.to_string()));
        }

        let symbol = symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        Ok(Self {
            destination: destination.to_string(),
            symbol,
        })
    }

    /// Claim for the native currency.
    pub fn native(destination: &str) -> Result<Self, InvalidClaim> {
        Self::new(destination, None)
    }

    /// Claim for a registered token.
    pub fn token(destination: &str, symbol: &str) -> Result<Self, InvalidClaim> {
        Self::new(destination, Some(symbol))
    }

    /// The address that receives the payout.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Lower-cased token symbol, or `None` for the native currency.
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Whether this claim pays out the native currency.
    pub fn is_native(&self) -> bool {
        self.symbol.is_none()
    }
}

impl fmt::Display for ClaimRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{} ({})", self.destination, symbol),
            None => f.write_str(&self.destination),
        }
    }
}

/// Identifier of a submitted ledger transaction (usually a hex hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a raw identifier returned by the ledger.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

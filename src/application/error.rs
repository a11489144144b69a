//! Claim outcomes and errors.

use crate::application::ports::TransferError;
use crate::domain::claim::{ClaimRequest, InvalidClaim, TransactionId};
use crate::domain::payout::AmountOverflow;

/// Successful answer to a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Dispatched synchronously; the ledger returned this transaction id.
    Dispatched(TransactionId),
    /// Accepted into the overflow queue; the drain loop will send it later.
    Queued,
}

/// Why a claim was not served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    /// The client claimed again before its interval elapsed.
    #[error("you have exceeded the rate limit, please wait before claiming again")]
    RateLimited,
    /// The overflow queue is at capacity.
    #[error("faucet queue is too long, please try again later")]
    QueueFull,
    /// The requested token symbol is not registered.
    #[error("unknown token {0:?}")]
    UnknownToken(String),
    /// The request was malformed.
    #[error(transparent)]
    InvalidClaim(#[from] InvalidClaim),
    /// The payout cannot be expressed in the token's base units.
    #[error(transparent)]
    InvalidAmount(#[from] AmountOverflow),
    /// The ledger transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl ClaimError {
    /// Whether the requester caused the error and retrying unchanged won't help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClaimError::UnknownToken(_) | ClaimError::InvalidClaim(_)
        )
    }

    /// Whether the claim was turned away before any transfer was attempted,
    /// so the client's rate-limit grant should be handed back.
    pub fn refunds_grant(&self) -> bool {
        matches!(
            self,
            ClaimError::QueueFull | ClaimError::UnknownToken(_) | ClaimError::InvalidClaim(_)
        )
    }

    /// Whether retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClaimError::RateLimited | ClaimError::QueueFull | ClaimError::Transfer(_)
        )
    }
}

/// Outcome of one claim processed by the drain loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    /// The claim that was processed
    pub claim: ClaimRequest,
    /// Transaction id on success
    pub result: Result<TransactionId, ClaimError>,
}

impl DispatchRecord {
    /// Whether the transfer succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_classification() {
        assert!(ClaimError::UnknownToken("foo".into()).is_client_error());
        assert!(!ClaimError::UnknownToken("foo".into()).is_retryable());
        assert!(ClaimError::QueueFull.is_retryable());
        assert!(ClaimError::RateLimited.is_retryable());
        assert!(ClaimError::Transfer(TransferError::Timeout(Duration::from_secs(5))).is_retryable());
        assert!(ClaimError::from(InvalidClaim::MissingDestination).is_client_error());
        assert!(!ClaimError::InvalidAmount(AmountOverflow { units: 1, decimals: 80 }).is_client_error());
    }

    #[test]
    fn test_grant_refunded_only_when_nothing_was_sent() {
        assert!(ClaimError::QueueFull.refunds_grant());
        assert!(ClaimError::UnknownToken("foo".into()).refunds_grant());
        assert!(ClaimError::from(InvalidClaim::MissingDestination).refunds_grant());
        assert!(!ClaimError::RateLimited.refunds_grant());
        assert!(!ClaimError::InvalidAmount(AmountOverflow { units: 1, decimals: 80 }).refunds_grant());
        assert!(!ClaimError::Transfer(TransferError::Timeout(Duration::from_secs(5))).refunds_grant());
    }

    #[test]
    fn test_transfer_error_message_passes_through() {
        let err = ClaimError::from(TransferError::Rejected("insufficient funds".into()));
        assert_eq!(err.to_string(), "transfer rejected: insufficient funds");
    }
}

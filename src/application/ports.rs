//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::claim::TransactionId;
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// The rate limiter keeps one record per client identity here. Infrastructure
/// provides the concrete implementation (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// The accessor runs while the entry is exclusively held, so a
    /// read-modify-write inside it is indivisible with respect to other
    /// calls for the same key.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Copy of the value stored under `key`, if any.
    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;
}

/// Failure of a single on-chain transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The transfer did not complete before the dispatch deadline
    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),
    /// The ledger node answered with an error object
    #[error("ledger rejected request ({code}): {message}")]
    Rpc {
        /// Error code reported by the node
        code: i64,
        /// Error message reported by the node
        message: String,
    },
    /// The ledger node could not be reached or answered garbage
    #[error("ledger transport error: {0}")]
    Transport(String),
    /// The destination is not a valid address for this ledger
    #[error("invalid destination address: {0}")]
    InvalidDestination(String),
    /// The sink refused the transfer for another reason
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Port for submitting one on-chain transfer.
///
/// Implementations sharing a signing identity must not be called
/// concurrently: the ledger orders transactions from one sender by nonce.
/// The dispatch lock provides that serialization.
#[async_trait]
pub trait TransferSink: Send + Sync + Debug {
    /// Public identity of the sending account.
    fn sender(&self) -> &str;

    /// Decimals of the currency this sink transfers.
    fn decimals(&self) -> u32 {
        crate::domain::payout::NATIVE_DECIMALS
    }

    /// Transfer `amount` base units to `destination`.
    async fn transfer(
        &self,
        destination: &str,
        amount: u128,
    ) -> Result<TransactionId, TransferError>;
}

//! Domain layer - pure types with no I/O.
//!
//! This layer contains the core concepts of the faucet:
//! - Claim requests and transaction identifiers
//! - Client identity derivation behind reverse proxies
//! - The minimum-interval grant policy
//! - Payout amounts and their base-unit scaling
//!
//! All types in this layer are pure and easily testable.

pub mod claim;
pub mod identity;
pub mod network;
pub mod payout;
pub mod policy;

//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Storage implementations (sharded maps)
//! - Configuration and token file loading
//! - The JSON-RPC ledger sink
//! - The HTTP surface and the `Faucet` assembly

pub mod clock;
pub mod config;
pub mod faucet;
pub mod http;
pub mod rpc_sink;
pub mod storage;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles: a clock,
/// a recording transfer sink and a log capture layer.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;

//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Rate limiter (one grant per client per interval)
//! - Admission controller (fast path or overflow queue)
//! - Drain loop (periodic background dispatch of queued claims)
//!
//! The dispatch lock is shared by admission and drain so that at most one
//! transfer is in flight at any time.
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod admission;
pub mod dispatcher;
pub mod drain;
pub mod error;
pub mod limiter;
pub mod lock;
pub mod metrics;
pub mod ports;
pub mod queue;
pub mod registry;

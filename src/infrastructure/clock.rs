//! Clock adapters for time operations.
//!
//! `SystemClock` drives the rate limiter in production. Tests use
//! `MockClock` from `crate::infrastructure::mocks` to step through claim
//! intervals without sleeping.

use crate::application::ports::Clock;
use std::time::Instant;

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

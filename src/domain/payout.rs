//! Payout amounts.
//!
//! Operators configure the payout in whole units of the currency. Ledgers
//! transfer integer base units, so the amount is scaled by the currency's
//! decimals at dispatch time.

use std::fmt;

/// Decimals of the native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Payout in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Payout(u64);

/// The scaled amount does not fit in 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("payout of {units} units with {decimals} decimals overflows")]
pub struct AmountOverflow {
    /// Whole units requested
    pub units: u64,
    /// Decimals of the currency
    pub decimals: u32,
}

impl Payout {
    /// Payout of `units` whole units.
    pub fn new(units: u64) -> Self {
        Self(units)
    }

    /// Whole units.
    pub fn units(&self) -> u64 {
        self.0
    }

    /// Amount in base units for a currency with `decimals` decimals.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the result exceeds `u128::MAX`.
    pub fn to_base_units(&self, decimals: u32) -> Result<u128, AmountOverflow> {
        let overflow = AmountOverflow {
            units: self.0,
            decimals,
        };
        10u128
            .checked_pow(decimals)
            .and_then(|scale| scale.checked_mul(u128::from(self.0)))
            .ok_or(overflow)
    }
}

impl fmt::Display for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

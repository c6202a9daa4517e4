//! # Amounts
//!
//! The ledger speaks integers in its smallest unit (lamports for the native
//! coin, base units for the token). People speak decimals. This module is the
//! only place that converts between the two, and it does so exactly: no
//! floating point ever touches a balance.
//!
//! The scale is [`UNIT_SCALE`](crate::config::UNIT_SCALE) on every path:
//! the faucet request, the mint quantity, and the reported values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{UNIT_DECIMALS, UNIT_SCALE};

/// Errors from converting human-denominated quantities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The value does not fit in a `u64` once scaled.
    #[error("amount overflow: {0} does not fit in smallest units")]
    Overflow(String),

    /// More fractional digits than the unit scale can represent.
    #[error("too many decimal places in '{input}' (at most {max})")]
    TooPrecise {
        /// The rejected input.
        input: String,
        /// Maximum fractional digits accepted.
        max: usize,
    },

    /// Not a plain non-negative decimal number.
    #[error("invalid amount '{0}'")]
    Invalid(String),
}

/// A non-negative quantity in the ledger's smallest unit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero smallest units.
    pub const ZERO: Amount = Amount(0);

    /// Wraps a raw smallest-unit value as returned by the ledger.
    pub const fn from_smallest(raw: u64) -> Self {
        Self(raw)
    }

    /// Converts whole human units to smallest units.
    pub fn from_units(units: u64) -> Result<Self, AmountError> {
        units
            .checked_mul(UNIT_SCALE)
            .map(Self)
            .ok_or_else(|| AmountError::Overflow(units.to_string()))
    }

    /// Parses a human decimal such as `"2"`, `"0.5"` or `"100.000000001"`.
    pub fn parse_units(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !digits_only(whole)
            || !digits_only(fraction)
            || (trimmed.contains('.') && fraction.is_empty())
        {
            return Err(AmountError::Invalid(input.to_string()));
        }
        if fraction.len() > UNIT_DECIMALS {
            return Err(AmountError::TooPrecise {
                input: input.to_string(),
                max: UNIT_DECIMALS,
            });
        }

        let whole_units: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| AmountError::Overflow(input.to_string()))?
        };
        let fraction_units: u64 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<width$}", width = UNIT_DECIMALS);
            padded
                .parse()
                .map_err(|_| AmountError::Invalid(input.to_string()))?
        };

        Self::from_units(whole_units)
            .map_err(|_| AmountError::Overflow(input.to_string()))?
            .checked_add(Self(fraction_units))
            .ok_or_else(|| AmountError::Overflow(input.to_string()))
    }

    /// The raw smallest-unit value.
    pub const fn smallest(self) -> u64 {
        self.0
    }

    /// Whole human units, truncating any fraction.
    pub const fn whole_units(self) -> u64 {
        self.0 / UNIT_SCALE
    }

    /// Checked addition. `None` on overflow.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction. `None` if `other` is larger.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Human-denominated decimal string with trailing zeros trimmed:
    /// `100_000_000_000` → `"100"`, `1_500_000_000` → `"1.5"`.
    pub fn to_human(self) -> String {
        let whole = self.0 / UNIT_SCALE;
        let fraction = self.0 % UNIT_SCALE;
        if fraction == 0 {
            return whole.to_string();
        }
        let digits = format!("{fraction:0>width$}", width = UNIT_DECIMALS);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human decimal string → smallest units.
pub fn to_smallest_unit(human: &str) -> Result<Amount, AmountError> {
    Amount::parse_units(human)
}

/// Smallest units → human decimal string.
pub fn from_smallest_unit(amount: Amount) -> String {
    amount.to_human()
}

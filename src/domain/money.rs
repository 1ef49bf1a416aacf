//! Fixed-point monetary types.
//!
//! Volatility is estimated in floating point, but every monetary value
//! (prices, notionals, escrowed margin) stays in unsigned fixed-point
//! integers so repeated computations never drift. Floats cross into money
//! exactly once, at the basis-points rounding boundary in
//! [`margin`](super::margin).

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use super::error::DomainError;

/// Fractional digits carried by [`Usd`].
pub const USD_DECIMALS: u32 = 8;

/// Fractional digits carried by [`Quantity`].
pub const QUANTITY_DECIMALS: u32 = 18;

const USD_SCALE: u128 = 100_000_000;
const QUANTITY_SCALE: u128 = 1_000_000_000_000_000_000;

/// An unsigned USD amount in 1e-8 units.
///
/// Used for oracle prices, notionals, margin, and escrow balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Usd(u128);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    /// Create from raw 1e-8 units.
    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Raw 1e-8 units.
    #[must_use]
    pub const fn units(&self) -> u128 {
        self.0
    }

    /// Convert a decimal USD amount (e.g. `dec!(65000.25)`) to fixed point.
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        if value.is_sign_negative() {
            return Err(DomainError::InvalidAmount {
                reason: format!("USD amount must be non-negative, got {value}"),
            });
        }
        let scaled = value
            .checked_mul(Decimal::from(USD_SCALE))
            .and_then(|d| d.trunc().to_u128())
            .ok_or_else(|| DomainError::InvalidAmount {
                reason: format!("USD amount {value} out of range"),
            })?;
        Ok(Self(scaled))
    }

    /// Lossy conversion to a float, for the volatility stage only.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / USD_SCALE as f64
    }

    /// `amount * bps / 10_000` in pure integer arithmetic.
    #[must_use]
    pub fn apply_bps(&self, bps: u32) -> Usd {
        Usd(self.0 * u128::from(bps) / 10_000)
    }

    pub fn checked_add(&self, other: Usd) -> Option<Usd> {
        self.0.checked_add(other.0).map(Usd)
    }

    pub fn checked_sub(&self, other: Usd) -> Option<Usd> {
        self.0.checked_sub(other.0).map(Usd)
    }

    /// Signed difference in 1e-8 units.
    #[must_use]
    pub fn signed_delta(&self, earlier: Usd) -> i128 {
        self.0 as i128 - earlier.0 as i128
    }

    /// Render a signed 1e-8 delta the same way `Display` renders amounts.
    #[must_use]
    pub fn format_signed(units: i128) -> String {
        let sign = if units < 0 { "-" } else { "" };
        let abs = units.unsigned_abs();
        format!("{sign}{}.{:08}", abs / USD_SCALE, abs % USD_SCALE)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / USD_SCALE, self.0 % USD_SCALE)
    }
}

impl Serialize for Usd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An unsigned asset quantity in 1e-18 units (e.g. fractions of one BTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(u128);

impl Quantity {
    /// Create from raw 1e-18 units.
    #[must_use]
    pub const fn from_units(units: u128) -> Self {
        Self(units)
    }

    /// Raw 1e-18 units.
    #[must_use]
    pub const fn units(&self) -> u128 {
        self.0
    }

    /// Convert a decimal quantity (e.g. `dec!(0.01)` BTC) to fixed point.
    pub fn from_decimal(value: Decimal) -> Result<Self, DomainError> {
        if value.is_sign_negative() {
            return Err(DomainError::InvalidAmount {
                reason: format!("quantity must be non-negative, got {value}"),
            });
        }
        let scaled = value
            .checked_mul(Decimal::from(QUANTITY_SCALE))
            .and_then(|d| d.trunc().to_u128())
            .ok_or_else(|| DomainError::InvalidAmount {
                reason: format!("quantity {value} out of range"),
            })?;
        Ok(Self(scaled))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:018}",
            self.0 / QUANTITY_SCALE,
            self.0 % QUANTITY_SCALE
        )
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `price * quantity`, scaled back to USD fixed point.
pub fn notional(price: Usd, quantity: Quantity) -> Result<Usd, DomainError> {
    price
        .units()
        .checked_mul(quantity.units())
        .map(|raw| Usd::from_units(raw / QUANTITY_SCALE))
        .ok_or_else(|| DomainError::NotionalOverflow {
            price: price.to_string(),
            quantity: quantity.to_string(),
        })
}

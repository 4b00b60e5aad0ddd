//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Every step/notional
//! comparison against exchange filters goes through these types; a single
//! ULP of binary-float drift must never flip an accept into a reject.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to keep prices from being mixed up with quantities
/// in sizing arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Snap down to the nearest tick.
    #[inline]
    pub fn floor_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            return *self;
        }
        Self((self.0 / tick.0).floor() * tick.0)
    }

    /// Snap up to the nearest tick.
    #[inline]
    pub fn ceil_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            return *self;
        }
        Self((self.0 / tick.0).ceil() * tick.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Order/position quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qty(pub Decimal);

impl Qty {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Snap down to the quantity step. Never rounds up past the input.
    #[inline]
    pub fn floor_to_step(&self, step: Qty) -> Self {
        if step.is_zero() {
            return *self;
        }
        Self((self.0 / step.0).floor() * step.0)
    }

    /// Snap up to the quantity step. Used when a *full* cover is required
    /// (closing a leg) or when lifting to an exchange minimum.
    #[inline]
    pub fn ceil_to_step(&self, step: Qty) -> Self {
        if step.is_zero() {
            return *self;
        }
        Self((self.0 / step.0).ceil() * step.0)
    }

    /// Whether this quantity sits exactly on the step grid.
    #[inline]
    pub fn is_step_aligned(&self, step: Qty) -> bool {
        if step.is_zero() {
            return true;
        }
        (self.0 % step.0).is_zero()
    }

    /// Notional value: quantity × price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Qty {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Qty {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Qty {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_qty_floor_to_step() {
        let qty = Qty::new(dec!(1.2349));
        let step = Qty::new(dec!(0.001));
        assert_eq!(qty.floor_to_step(step).inner(), dec!(1.234));
    }

    #[test]
    fn test_qty_ceil_to_step() {
        let qty = Qty::new(dec!(1.2341));
        let step = Qty::new(dec!(0.001));
        assert_eq!(qty.ceil_to_step(step).inner(), dec!(1.235));

        // Already aligned: ceil must not move it
        let aligned = Qty::new(dec!(1.234));
        assert_eq!(aligned.ceil_to_step(step).inner(), dec!(1.234));
    }

    #[test]
    fn test_qty_step_alignment() {
        let step = Qty::new(dec!(0.001));
        assert!(Qty::new(dec!(0.05)).is_step_aligned(step));
        assert!(!Qty::new(dec!(0.0505)).is_step_aligned(Qty::new(dec!(0.01))));
        // Zero step means no grid
        assert!(Qty::new(dec!(0.123456)).is_step_aligned(Qty::ZERO));
    }

    #[test]
    fn test_price_tick_snapping() {
        let tick = Price::new(dec!(0.01));
        assert_eq!(Price::new(dec!(100.019)).floor_to_tick(tick).inner(), dec!(100.01));
        assert_eq!(Price::new(dec!(100.011)).ceil_to_tick(tick).inner(), dec!(100.02));
    }

    #[test]
    fn test_notional() {
        let qty = Qty::new(dec!(0.05));
        let price = Price::new(dec!(100));
        assert_eq!(qty.notional(price), dec!(5.00));
    }

    #[test]
    fn test_exact_arithmetic_no_drift() {
        // 0.1 + 0.2 == 0.3 exactly, unlike f64
        let a = Qty::new(dec!(0.1)) + Qty::new(dec!(0.2));
        assert_eq!(a.inner(), dec!(0.3));
        assert!(a.is_step_aligned(Qty::new(dec!(0.1))));
    }
}

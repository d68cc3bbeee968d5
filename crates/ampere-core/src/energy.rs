//! Exact, non-negative energy quantities.
//!
//! Energy is stored as an arbitrary-precision decimal so that repeated
//! transfers never accumulate rounding error. Amounts persist as canonical
//! decimal text and parse back to an equal value.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Errors produced when parsing an [`Energy`] amount from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnergyParseError {
    #[error("invalid energy amount '{0}'")]
    Invalid(String),
    #[error("energy amount '{0}' is negative")]
    Negative(String),
}

/// A non-negative exact decimal amount of energy.
///
/// Subtraction saturates at zero; use [`Energy::checked_sub`] when the
/// caller needs to know the subtrahend was too large.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Energy(Decimal);

impl Energy {
    pub const ZERO: Energy = Energy(Decimal::ZERO);
    pub const ONE: Energy = Energy(Decimal::ONE);

    /// Wrap a decimal, clamping negative values to zero.
    pub fn new(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO))
    }

    /// Build an amount from a mantissa and a decimal scale, e.g.
    /// `Energy::from_scaled(375, 1)` is 37.5.
    pub fn from_scaled(mantissa: i64, scale: u32) -> Self {
        Self::new(Decimal::new(mantissa, scale))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whole units, truncated toward zero.
    pub fn as_int(&self) -> i64 {
        self.0.trunc().to_i64().unwrap_or(i64::MAX)
    }

    pub fn checked_sub(self, rhs: Energy) -> Option<Energy> {
        if rhs > self {
            None
        } else {
            Some(Energy(self.0 - rhs.0))
        }
    }
}

impl From<u32> for Energy {
    fn from(v: u32) -> Self {
        Self(Decimal::from(v))
    }
}

impl From<u64> for Energy {
    fn from(v: u64) -> Self {
        Self(Decimal::from(v))
    }
}

impl From<Decimal> for Energy {
    fn from(v: Decimal) -> Self {
        Self::new(v)
    }
}

impl Add for Energy {
    type Output = Energy;

    fn add(self, rhs: Energy) -> Energy {
        Energy(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Energy {
    fn add_assign(&mut self, rhs: Energy) {
        *self = *self + rhs;
    }
}

impl Sub for Energy {
    type Output = Energy;

    fn sub(self, rhs: Energy) -> Energy {
        Energy::new(self.0 - rhs.0)
    }
}

impl SubAssign for Energy {
    fn sub_assign(&mut self, rhs: Energy) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Energy {
    type Err = EnergyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str_exact(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| EnergyParseError::Invalid(s.to_string()))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EnergyParseError::Negative(s.to_string()));
        }
        Ok(Energy(value))
    }
}

// ---------------------------------------------------------------------------
// Serde: always written as decimal text, read from text or plain numbers
// ---------------------------------------------------------------------------

impl Serialize for Energy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct EnergyVisitor;

impl Visitor<'_> for EnergyVisitor {
    type Value = Energy;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Energy, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Energy, E> {
        Ok(Energy::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Energy, E> {
        if v < 0 {
            return Err(E::custom(EnergyParseError::Negative(v.to_string())));
        }
        Ok(Energy(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Energy, E> {
        let value = Decimal::from_f64(v)
            .ok_or_else(|| E::custom(EnergyParseError::Invalid(v.to_string())))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(E::custom(EnergyParseError::Negative(v.to_string())));
        }
        Ok(Energy(value))
    }
}

impl<'de> Deserialize<'de> for Energy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Binary formats are not self-describing; they only ever see the
        // string form written by `serialize`.
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(EnergyVisitor)
        } else {
            deserializer.deserialize_str(EnergyVisitor)
        }
    }
}

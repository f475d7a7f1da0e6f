//! Exact-decimal monetary value.

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use bigdecimal::{BigDecimal, ParseBigDecimalError, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Monetary amount backed by an arbitrary-precision decimal.
///
/// Addition, subtraction and comparison are exact; values are only widened to
/// `f64` at the presentation edge (see [`Money::to_f64`]). Serialized as a
/// plain decimal string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(BigDecimal);

impl Money {
    pub fn new(value: BigDecimal) -> Self {
        Money(value)
    }

    pub fn zero() -> Self {
        Money(BigDecimal::from(0))
    }

    pub fn plus(&self, other: &Money) -> Money {
        Money(&self.0 + &other.0)
    }

    pub fn minus(&self, other: &Money) -> Money {
        Money(&self.0 - &other.0)
    }

    pub fn times(&self, factor: &BigDecimal) -> Money {
        Money(&self.0 * factor)
    }

    pub fn divided_by(&self, divisor: i64) -> Money {
        Money(&self.0 / BigDecimal::from(divisor))
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigDecimal::from(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < BigDecimal::from(0)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > BigDecimal::from(0)
    }

    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    pub fn into_decimal(self) -> BigDecimal {
        self.0
    }

    /// Two-decimal-place rendering for display and audit output.
    pub fn to_fixed(&self) -> String {
        self.0.with_scale(2).to_string()
    }

    /// Lossy widening, for percentage/ratio fields in read-side responses only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl From<BigDecimal> for Money {
    fn from(value: BigDecimal) -> Self {
        Money(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money(BigDecimal::from(value))
    }
}

impl FromStr for Money {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim()).map(Money)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fixed())
    }
}

//! Fare amounts in minor currency units.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A fare amount held as an integer count of minor units (cents).
///
/// Amounts are currency-agnostic: the search compares and sums them but never
/// converts between currencies. Integer storage keeps score comparison exact,
/// which the frontier relies on for deterministic ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest representable amount, used as "no bound known".
    pub const MAX: Money = Money(i64::MAX);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Whole currency units, e.g. `from_major(250)` is 250.00.
    pub const fn from_major(major: i64) -> Self {
        Money(major.saturating_mul(100))
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// The amount in major units as a float, for statistics.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Convert a major-unit float back to money, rounding to the nearest cent.
    pub fn from_f64(major: f64) -> Self {
        if !major.is_finite() {
            return if major > 0.0 { Money::MAX } else { Money::ZERO };
        }
        Money((major * 100.0).round() as i64)
    }

    /// Multiply by a factor, rounding to the nearest cent.
    pub fn scale(self, factor: f64) -> Self {
        Money::from_f64(self.as_f64() * factor)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Money::MAX {
            return f.write_str("MAX");
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({})", self)
    }
}

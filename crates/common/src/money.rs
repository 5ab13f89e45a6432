//! Money amounts stored as integer cents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An amount string that is not a finite decimal number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError {
    pub input: String,
}

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid amount: {:?}", self.input)
    }
}

impl std::error::Error for ParseMoneyError {}

/// A signed amount of cents.
///
/// Request and response bodies carry decimal dollars; [`Money::from_f64`] and
/// [`Money::as_f64`] convert at the HTTP edge so pricing stays in integers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }

    /// Rounds a dollar value to the nearest cent. NaN and infinities yield `None`.
    pub fn from_f64(dollars: f64) -> Option<Self> {
        dollars
            .is_finite()
            .then(|| Money((dollars * 100.0).round() as i64))
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whole dollars, truncated toward zero.
    pub const fn dollars(self) -> i64 {
        self.0 / 100
    }

    /// Cents below the dollar, always in `0..100`.
    pub const fn cents_part(self) -> i64 {
        (self.0 % 100).abs()
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Price of `quantity` units at this unit price, `None` on overflow.
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `percent`% of the amount, rounded half away from zero.
    pub fn percentage(self, percent: f64) -> Money {
        Money((self.0 as f64 * percent / 100.0).round() as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}${}.{:02}",
            self.dollars().unsigned_abs(),
            self.cents_part()
        )
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s.trim().parse::<f64>().ok().and_then(Money::from_f64);
        parsed.ok_or_else(|| ParseMoneyError {
            input: s.to_string(),
        })
    }
}

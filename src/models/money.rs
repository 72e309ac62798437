//! Money type for representing balances and amounts
//!
//! Amounts are whole integer units. There is no currency and no fractional
//! part. Operators are plain i64 arithmetic; balance changes go through
//! [`Money::checked_add`] and [`Money::checked_sub`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A signed amount of integer units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from integer units
    ///
    /// # Examples
    /// ```
    /// use policy_ledger::models::Money;
    /// let amount = Money::from_units(250);
    /// assert_eq!(amount.units(), 250);
    /// ```
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in units
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// `self + other`, or `None` on overflow
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// `self - other`, or `None` on overflow
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Parse an amount from a string
    ///
    /// Accepts optionally signed integers, with `_` or `,` as digit
    /// separators: "100", "-50", "1_000", "1,000".
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '_' && *c != ',').collect();
        if cleaned.is_empty() {
            return Err(MoneyParseError::InvalidFormat(s.to_string()));
        }
        cleaned
            .parse::<i64>()
            .map(Self)
            .map_err(|_| MoneyParseError::InvalidFormat(s.to_string()))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self(units)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid amount: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}

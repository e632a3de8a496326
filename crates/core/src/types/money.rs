//! Fixed-precision monetary amounts.
//!
//! Amounts are stored as `NUMERIC(12,2)` and travel over the wire as strings
//! with exactly two decimal places (`"30.25"`), so repeated recomputation from
//! the same inputs always produces the same representation.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places every stored amount carries.
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount normalized to two decimal places.
///
/// Rounding is half away from zero, matching how shop prices are quoted.
///
/// ```
/// use rust_decimal::Decimal;
/// use tireshop_core::Money;
///
/// let price = Money::new(Decimal::new(1005, 3)); // 1.005
/// assert_eq!(price.to_string(), "1.01");
/// assert_eq!(Money::new(Decimal::from(25)).to_string(), "25.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero with two decimal places.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, MONEY_SCALE));

    /// Largest amount a `NUMERIC(12,2)` column holds: `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, MONEY_SCALE));

    /// Create an amount, rounding to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(MONEY_SCALE);
        Self(rounded)
    }

    /// Create an amount from a count of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether the amount fits a stored money column.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        self.0.abs() <= Self::MAX.0
    }

    /// Multiply by a decimal factor and round back to two places.
    ///
    /// `None` on `Decimal` overflow.
    #[must_use]
    pub fn checked_scale_by(self, factor: Decimal) -> Option<Self> {
        self.0.checked_mul(factor).map(Self::new)
    }

    /// Multiply by a quantity and round back to two places.
    ///
    /// `None` on `Decimal` overflow.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.checked_scale_by(Decimal::from(quantity))
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self::new)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self::new)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_always_two_decimal_places() {
        assert_eq!(money("25").to_string(), "25.00");
        assert_eq!(money("5.2").to_string(), "5.20");
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::from_cents(3025).to_string(), "30.25");
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(money("0.105").to_string(), "0.11");
        assert_eq!(money("0.104").to_string(), "0.10");
        assert_eq!(money("-0.105").to_string(), "-0.11");
    }

    #[test]
    fn test_arithmetic_stays_normalized() {
        let line = money("10.00").checked_times(2).unwrap();
        assert_eq!(line.checked_add(money("5")).unwrap().to_string(), "25.00");
        assert_eq!(money("30.25").checked_sub(money("0.25")).unwrap().to_string(), "30.00");
        assert_eq!(money("0.50").checked_scale_by(Decimal::new(21, 2)).unwrap().to_string(), "0.11");
    }

    #[test]
    fn test_overflow_is_reported_not_panicked() {
        let huge = money("70000000000000000000000000000");
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Money::new(Decimal::MIN).checked_sub(money("1")), None);
    }

    #[test]
    fn test_storable_bound_matches_numeric_12_2() {
        assert_eq!(Money::MAX.to_string(), "9999999999.99");
        assert!(Money::MAX.is_storable());
        assert!(money("-9999999999.99").is_storable());
        assert!(!money("10000000000.00").is_storable());
        assert!(!money("100000000000").is_storable());
    }

    #[test]
    fn test_negative_detection() {
        assert!(money("-0.01").is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!money("-0.00").is_negative());
    }

    #[test]
    fn test_serializes_as_string_and_accepts_numbers() {
        assert_eq!(serde_json::to_string(&money("30.25")).unwrap(), "\"30.25\"");
        let from_str: Money = serde_json::from_str("\"10\"").unwrap();
        assert_eq!(from_str.to_string(), "10.00");
        let from_num: Money = serde_json::from_str("89.9").unwrap();
        assert_eq!(from_num.to_string(), "89.90");
    }
}

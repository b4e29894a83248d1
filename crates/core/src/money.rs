//! Fixed-point monetary amounts.
//!
//! Amounts are `rust_decimal::Decimal` values (Postgres `NUMERIC`), never binary
//! floating point. Rounding is half-up (midpoint away from zero) to two decimal
//! places, applied explicitly via [`Money::rounded`].
//!
//! Arithmetic is checked: every operation returns `None` on overflow instead of
//! panicking, and [`Money::is_storable`] bounds values to the `NUMERIC(18,2)`
//! column range.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Number of decimal places amounts are rounded to.
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount in the (single) shop currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest amount a `NUMERIC(18,2)` column holds: `9999999999999999.99`.
    pub const MAX_STORABLE: Money = Money(Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 2));

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build from an integer number of cents (e.g. `from_cents(10_000)` is `100.00`).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round half-up to two decimal places, normalizing the scale to exactly two.
    pub fn rounded(self) -> Self {
        let mut value = self
            .0
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(MONEY_SCALE);
        Self(value)
    }

    /// Whether the amount fits the storage column, in either sign.
    pub fn is_storable(&self) -> bool {
        self.0.abs() <= Self::MAX_STORABLE.0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// `self × quantity`, unrounded.
    pub fn checked_mul(self, quantity: i32) -> Option<Money> {
        self.0.checked_mul(Decimal::from(quantity)).map(Money)
    }

    /// Multiply by a rate (e.g. a tax rate) without rounding.
    pub fn checked_times_rate(self, rate: Decimal) -> Option<Money> {
        self.0.checked_mul(rate).map(Money)
    }

    /// Sum of `amounts`, or `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn rounds_half_up_to_cents() {
        assert_eq!(money("1.005").rounded(), money("1.01"));
        assert_eq!(money("1.004").rounded(), money("1.00"));
        assert_eq!(money("2.675").rounded(), money("2.68"));
        assert_eq!(money("60").rounded().to_string(), "60.00");
    }

    #[test]
    fn sums_exactly() {
        let parts = vec![money("0.10"), money("0.20"), money("0.30")];
        assert_eq!(Money::checked_sum(parts), Some(money("0.60")));
    }

    #[test]
    fn overflow_is_reported_not_panicked() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_add(money("1")), None);
        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_times_rate(Decimal::TWO), None);
        assert_eq!(Money::checked_sum([huge, huge]), None);
        let priced = Money::new(Decimal::from_scientific("5e28").unwrap());
        assert_eq!(priced.checked_mul(2), None);
    }

    #[test]
    fn storable_range_matches_numeric_18_2() {
        assert_eq!(Money::MAX_STORABLE, money("9999999999999999.99"));
        assert_eq!(Money::MAX_STORABLE.to_string(), "9999999999999999.99");
        assert!(Money::MAX_STORABLE.is_storable());
        assert!(!money("10000000000000000.00").is_storable());
        assert!(!money("-10000000000000000").is_storable());
        assert!(money("-19.99").is_storable());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&money("460.00")).unwrap();
        assert_eq!(json, "\"460.00\"");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: rounding is idempotent and never moves more than half a cent.
            #[test]
            fn rounding_is_idempotent_and_bounded(mantissa in -10_000_000i64..10_000_000i64, scale in 0u32..6) {
                let raw = Money::new(Decimal::new(mantissa, scale));
                let once = raw.rounded();
                prop_assert_eq!(once, once.rounded());
                let drift = (once.amount() - raw.amount()).abs();
                prop_assert!(drift <= Decimal::new(5, 3));
            }
        }
    }
}

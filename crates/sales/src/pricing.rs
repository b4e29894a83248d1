//! Line pricing: subtotal, tax and total for a quantity at a unit price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordermgmt_core::{Money, ValueObject};

/// Computed amounts for a line (or, summed, for a whole order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl LineAmounts {
    pub const ZERO: LineAmounts = LineAmounts {
        subtotal: Money::ZERO,
        tax: Money::ZERO,
        total: Money::ZERO,
    };

    /// Field-wise sum; `None` on overflow.
    pub fn checked_add(self, rhs: LineAmounts) -> Option<LineAmounts> {
        Some(LineAmounts {
            subtotal: self.subtotal.checked_add(rhs.subtotal)?,
            tax: self.tax.checked_add(rhs.tax)?,
            total: self.total.checked_add(rhs.total)?,
        })
    }

    /// Order totals over `lines`. `None` when a sum overflows or does not fit
    /// the storage columns.
    pub fn checked_sum<I: IntoIterator<Item = LineAmounts>>(lines: I) -> Option<LineAmounts> {
        lines
            .into_iter()
            .try_fold(LineAmounts::ZERO, LineAmounts::checked_add)
            .filter(LineAmounts::is_storable)
    }

    pub fn is_storable(&self) -> bool {
        self.subtotal.is_storable() && self.tax.is_storable() && self.total.is_storable()
    }
}

impl ValueObject for LineAmounts {}

/// Fixed tax pricing.
///
/// Every amount is rounded half-up to cents as soon as it is produced: the
/// subtotal, then the tax computed from the rounded subtotal. The total is the
/// exact sum of the two, so `subtotal + tax == total` holds for every line and,
/// by summation, for every order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingPolicy;

impl PricingPolicy {
    /// 15%.
    pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

    /// Amounts for `quantity` units at `unit_price`, or `None` when any of them
    /// overflows or falls outside [`Money::MAX_STORABLE`].
    pub fn compute(&self, quantity: i32, unit_price: Money) -> Option<LineAmounts> {
        let subtotal = unit_price.checked_mul(quantity)?.rounded();
        let tax = subtotal.checked_times_rate(Self::TAX_RATE)?.rounded();
        let amounts = LineAmounts {
            subtotal,
            tax,
            total: subtotal.checked_add(tax)?,
        };
        amounts.is_storable().then_some(amounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(quantity: i32, cents: i64) -> LineAmounts {
        PricingPolicy.compute(quantity, Money::from_cents(cents)).unwrap()
    }

    fn plus(a: Money, b: Money) -> Money {
        a.checked_add(b).unwrap()
    }

    #[test]
    fn four_units_at_one_hundred() {
        let amounts = price(4, 10_000);
        assert_eq!(amounts.subtotal, Money::from_cents(40_000));
        assert_eq!(amounts.tax, Money::from_cents(6_000));
        assert_eq!(amounts.total, Money::from_cents(46_000));
        assert_eq!(amounts.total.to_string(), "460.00");
    }

    #[test]
    fn tax_rounds_half_up() {
        // 0.10 * 0.15 = 0.015 -> 0.02
        let amounts = price(1, 10);
        assert_eq!(amounts.tax, Money::from_cents(2));
        assert_eq!(amounts.total, Money::from_cents(12));

        // 0.03 * 0.15 = 0.0045 -> 0.00
        let amounts = price(1, 3);
        assert_eq!(amounts.tax, Money::ZERO);
    }

    #[test]
    fn amounts_sum_fieldwise() {
        let a = price(1, 333);
        let b = price(2, 1_999);
        let sum = LineAmounts::checked_sum([a, b]).unwrap();
        assert_eq!(sum.subtotal, plus(a.subtotal, b.subtotal));
        assert_eq!(sum.tax, plus(a.tax, b.tax));
        assert_eq!(sum.total, plus(sum.subtotal, sum.tax));
    }

    #[test]
    fn oversized_amounts_are_refused() {
        let huge = Money::new(Decimal::from_scientific("5e28").unwrap());
        assert_eq!(PricingPolicy.compute(2, huge), None);
        assert_eq!(PricingPolicy.compute(1, Money::new(Decimal::MAX)), None);

        // Storable price, but the line total is not.
        assert_eq!(PricingPolicy.compute(i32::MAX, Money::MAX_STORABLE), None);
        // Subtotal fits, tax pushes the total over.
        assert_eq!(PricingPolicy.compute(1, Money::MAX_STORABLE), None);

        let line = price(1, 800_000_000_000_000_000);
        assert!(line.is_storable());
        assert_eq!(LineAmounts::checked_sum([line, line]), None);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: subtotal + tax == total, exactly, for every line.
            #[test]
            fn line_total_is_exact(quantity in 1i32..10_000, cents in 1i64..10_000_000) {
                let amounts = price(quantity, cents);
                prop_assert_eq!(plus(amounts.subtotal, amounts.tax), amounts.total);
                prop_assert_eq!(amounts.subtotal, Money::from_cents(cents * quantity as i64));
            }

            /// Property: summed order amounts stay consistent.
            #[test]
            fn order_total_is_sum_of_lines(lines in proptest::collection::vec((1i32..100, 1i64..1_000_000), 1..20)) {
                let all: Vec<LineAmounts> = lines.iter().map(|(q, c)| price(*q, *c)).collect();
                let order = LineAmounts::checked_sum(all.iter().copied()).unwrap();
                prop_assert_eq!(plus(order.subtotal, order.tax), order.total);
                prop_assert_eq!(Some(order.total), Money::checked_sum(all.iter().map(|l| l.total)));
            }

            /// Property: pricing never panics, whatever the price.
            #[test]
            fn pricing_is_total(quantity in 1i32..=i32::MAX, mantissa in 1i64..=i64::MAX, scale in 0u32..3) {
                let unit_price = Money::new(Decimal::new(mantissa, scale));
                if let Some(amounts) = PricingPolicy.compute(quantity, unit_price) {
                    prop_assert!(amounts.is_storable());
                    prop_assert_eq!(plus(amounts.subtotal, amounts.tax), amounts.total);
                }
            }
        }
    }
}

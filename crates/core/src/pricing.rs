//! Order pricing rules.
//!
//! Money is always [`Decimal`]; nothing here touches floating point.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Tax rate applied to the subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Flat shipping fee charged at or below the threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// A priced line: unit price times quantity.
pub trait PricedLine {
    /// Unit price of the product.
    fn unit_price(&self) -> Decimal;
    /// Number of units.
    fn quantity(&self) -> i32;

    /// `unit_price * quantity`.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

impl PricedLine for (Decimal, i32) {
    fn unit_price(&self) -> Decimal {
        self.0
    }

    fn quantity(&self) -> i32 {
        self.1
    }
}

/// Sum of line totals. An empty cart has a zero subtotal.
pub fn cart_subtotal<'a, L, I>(lines: I) -> Decimal
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, line| acc + line.line_total())
}

/// Sum of quantities across lines.
pub fn item_count<'a, L, I>(lines: I) -> i64
where
    L: PricedLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .map(|line| i64::from(line.quantity()))
        .sum()
}

/// Tax, shipping and grand total derived from a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals for a subtotal.
    ///
    /// Tax is rounded half away from zero to cents. Shipping is free only when
    /// the subtotal is strictly greater than 100.
    #[must_use]
    pub fn compute(subtotal: Decimal) -> Self {
        let tax = (subtotal * TAX_RATE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

/// Convert a major-unit amount to minor units (cents), rounding half away from zero.
///
/// Returns `None` when the result does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;

    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_subtotal_sums_line_totals() {
        let lines = [(dec("999.99"), 2), (dec("49.50"), 1)];
        assert_eq!(cart_subtotal(&lines), dec("2049.48"));
        assert_eq!(item_count(&lines), 3);
    }

    #[test]
    fn test_empty_cart() {
        let lines: [(Decimal, i32); 0] = [];
        assert_eq!(cart_subtotal(&lines), Decimal::ZERO);
        assert_eq!(item_count(&lines), 0);
    }

    #[test]
    fn test_totals_under_threshold_pay_shipping() {
        let totals = OrderTotals::compute(dec("50.00"));
        assert_eq!(totals.tax, dec("5.00"));
        assert_eq!(totals.shipping, dec("10"));
        assert_eq!(totals.total, dec("65.00"));
    }

    #[test]
    fn test_exactly_one_hundred_pays_shipping() {
        let totals = OrderTotals::compute(dec("100.00"));
        assert_eq!(totals.shipping, dec("10"));
        assert_eq!(totals.total, dec("120.00"));
    }

    #[test]
    fn test_above_threshold_ships_free() {
        let totals = OrderTotals::compute(dec("100.01"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, dec("10.00"));
        assert_eq!(totals.total, dec("110.01"));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.25 * 10% = 0.025 -> 0.03
        assert_eq!(OrderTotals::compute(dec("0.25")).tax, dec("0.03"));
        // 0.45 * 10% = 0.045 -> 0.05 (banker's rounding would give 0.04)
        assert_eq!(OrderTotals::compute(dec("0.45")).tax, dec("0.05"));
    }

    #[test]
    fn test_total_identity() {
        for s in ["0", "9.99", "99.99", "100", "250.10", "2499.99"] {
            let t = OrderTotals::compute(dec(s));
            assert_eq!(t.total, t.subtotal + t.tax + t.shipping);
        }
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(dec("19.99")), Some(1999));
        assert_eq!(to_minor_units(dec("0.005")), Some(1));
        assert_eq!(to_minor_units(dec("10")), Some(1000));
    }
}

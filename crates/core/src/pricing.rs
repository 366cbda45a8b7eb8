//! Order price breakdown.
//!
//! Shipping is free at or above the threshold and a flat fee below it; tax is
//! a flat rate on the item subtotal. These are fixed business rules, not
//! configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::price::round_cents;

/// Subtotal at which shipping becomes free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Flat shipping fee below the threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Tax rate applied to the item subtotal (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Item, tax, shipping, and total prices of an order.
///
/// `total_price == items_price + tax_price + shipping_price` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl PriceBreakdown {
    /// Price an order from its item subtotal.
    ///
    /// Tax is rounded to cents before summing so the total is exact.
    #[must_use]
    pub fn from_subtotal(items_price: Decimal) -> Self {
        let shipping_price = if items_price >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let tax_price = round_cents(items_price * TAX_RATE);

        Self {
            items_price,
            tax_price,
            shipping_price,
            total_price: items_price + tax_price + shipping_price,
        }
    }

    /// Whether the stored parts still add up to the stored total.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.items_price + self.tax_price + self.shipping_price == self.total_price
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_constants() {
        assert_eq!(FREE_SHIPPING_THRESHOLD, dec("100"));
        assert_eq!(FLAT_SHIPPING, dec("10"));
        assert_eq!(TAX_RATE, dec("0.10"));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let breakdown = PriceBreakdown::from_subtotal(dec("100.00"));
        assert_eq!(breakdown.shipping_price, Decimal::ZERO);
        assert_eq!(breakdown.tax_price, dec("10.00"));
        assert_eq!(breakdown.total_price, dec("110.00"));
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let breakdown = PriceBreakdown::from_subtotal(dec("99.99"));
        assert_eq!(breakdown.shipping_price, dec("10.00"));
        assert_eq!(breakdown.tax_price, dec("10.00"));
        assert_eq!(breakdown.total_price, dec("119.99"));
    }

    #[test]
    fn test_fifty_dollar_order() {
        let breakdown = PriceBreakdown::from_subtotal(dec("50.00"));
        assert_eq!(breakdown.items_price, dec("50.00"));
        assert_eq!(breakdown.tax_price, dec("5.00"));
        assert_eq!(breakdown.shipping_price, dec("10.00"));
        assert_eq!(breakdown.total_price, dec("65.00"));
    }

    #[test]
    fn test_total_is_exact_sum() {
        for raw in ["0", "0.01", "13.37", "99.95", "100", "250.49", "1234.56"] {
            let breakdown = PriceBreakdown::from_subtotal(dec(raw));
            assert!(breakdown.is_consistent(), "{raw}");
        }
    }

    #[test]
    fn test_empty_subtotal_still_ships() {
        let breakdown = PriceBreakdown::from_subtotal(Decimal::ZERO);
        assert_eq!(breakdown.shipping_price, dec("10"));
        assert_eq!(breakdown.tax_price, Decimal::ZERO);
    }
}

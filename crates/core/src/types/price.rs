//! Money amounts with decimal arithmetic.
//!
//! Catalog prices, cart snapshots, and order breakdowns are all plain
//! [`Decimal`] values in the store currency's standard unit (dollars, not
//! cents). [`Price`] attaches the currency when an amount leaves the system:
//! converted to minor units for the payment gateway.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors converting a price for the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    #[error("price {0} does not fit in minor currency units")]
    Overflow(Decimal),
}

/// Round an amount to whole cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in the store currency.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Amount in minor units (cents), rounded to the nearest cent.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative amounts and
    /// [`PriceError::Overflow`] if the cent value exceeds `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }
        (round_cents(self.amount) * Decimal::ONE_HUNDRED)
            .to_i64()
            .ok_or(PriceError::Overflow(self.amount))
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
}

impl CurrencyCode {
    /// Lowercase code as payment gateways expect it (`usd`).
    #[must_use]
    pub const fn gateway_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
        }
    }
}

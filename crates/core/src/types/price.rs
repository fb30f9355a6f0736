//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are stored in the currency's standard unit (rupees, dollars) as a
//! [`Decimal`], so sums of line items never accumulate binary floating-point
//! error. Conversion to the smallest currency unit (paise, cents) happens only
//! at the payment processor boundary.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a price.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),

    /// The amount does not fit the processor's integer representation.
    #[error("price is too large to convert to minor units: {0}")]
    Overflow(Decimal),
}

/// Largest order total the order store holds (`NUMERIC(14, 2)`).
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// Largest catalog price the product store holds (`NUMERIC(12, 2)`).
pub const MAX_PRODUCT_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Decimal places the stores keep for any amount.
pub const STORED_AMOUNT_SCALE: u32 = 2;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Amount in the smallest currency unit, rounded half away from zero.
    ///
    /// `499.995 INR` becomes `50000` paise.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative amounts and
    /// [`PriceError::Overflow`] when the result does not fit in an `i64`.
    pub fn minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }

        let factor = Decimal::from(10_i64.pow(self.currency_code.minor_unit_exponent()));
        self.amount
            .checked_mul(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .ok_or(PriceError::Overflow(self.amount))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol used when formatting prices.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Uppercase ISO code (e.g. `"INR"`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Lowercase code as the payment processor expects it (e.g. `"inr"`).
    #[must_use]
    pub fn processor_code(self) -> String {
        self.code().to_lowercase()
    }

    /// Number of decimal places in the smallest currency unit.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        match self {
            Self::INR | Self::USD | Self::EUR | Self::GBP | Self::CAD | Self::AUD => 2,
        }
    }

    /// Whether `amount` is a whole number of minor units (`5.000` is, `0.005` is not).
    #[must_use]
    pub fn is_whole_minor_units(self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.minor_unit_exponent()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

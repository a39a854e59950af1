//! Value objects for the order domain.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts a decimal amount to cents.
    ///
    /// Fractions of a cent are rounded half away from zero, so `0.125`
    /// becomes 13 cents.
    pub fn from_decimal(amount: Decimal) -> Result<Self, OrderError> {
        let cents = amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.to_i64())
            .ok_or_else(|| OrderError::InvalidAmount {
                value: amount.to_string(),
            })?;
        Ok(Self { cents })
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Formats the amount as a plain decimal string, e.g. `"49.99"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.dollars().abs(), self.cents_part())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

/// Settlement currency. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    /// ISO 4217 code, upper case.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A caller-supplied line-item descriptor.
///
/// Not validated against any catalog; stored and returned as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(serde_json::Value);

impl Product {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<&str> for Product {
    fn from(s: &str) -> Self {
        Self(serde_json::Value::String(s.to_string()))
    }
}

impl From<serde_json::Value> for Product {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// The payment provider an order was created against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Push-confirmation provider: settlement is reported by webhook.
    Stripe,
    /// Pull-confirmation provider: settlement happens on explicit capture.
    PayPal,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::PayPal => "paypal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stripe" => Some(Provider::Stripe),
            "paypal" => Some(Provider::PayPal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_money_from_decimal() {
        let money = Money::from_decimal(Decimal::from_str("49.99").unwrap()).unwrap();
        assert_eq!(money.cents(), 4999);
        assert_eq!(money.dollars(), 49);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_money_from_decimal_rounds_half_away_from_zero() {
        let money = Money::from_decimal(Decimal::from_str("0.125").unwrap()).unwrap();
        assert_eq!(money.cents(), 13);
        let money = Money::from_decimal(Decimal::from_str("10.004").unwrap()).unwrap();
        assert_eq!(money.cents(), 1000);
    }

    #[test]
    fn test_money_from_decimal_out_of_range() {
        assert!(matches!(
            Money::from_decimal(Decimal::MAX),
            Err(OrderError::InvalidAmount { .. })
        ));
        assert!(matches!(
            Money::from_decimal(Decimal::from_str("92233720368547758.08").unwrap()),
            Err(OrderError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_decimal_string() {
        assert_eq!(Money::from_cents(4999).to_decimal_string(), "49.99");
        assert_eq!(Money::from_cents(100).to_decimal_string(), "1.00");
        assert_eq!(Money::from_cents(7).to_decimal_string(), "0.07");
    }

    #[test]
    fn test_currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
        assert_eq!(Currency::Usd.code(), "USD");
    }

    #[test]
    fn test_product_is_opaque() {
        let product = Product::new(serde_json::json!({"sku": "sku-1", "qty": 2}));
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["sku"], "sku-1");
        assert_eq!(*Product::from("sku-2").as_value(), "sku-2");
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::Stripe.as_str(), "stripe");
        assert_eq!(Provider::parse("paypal"), Some(Provider::PayPal));
        assert_eq!(Provider::parse("venmo"), None);
    }
}

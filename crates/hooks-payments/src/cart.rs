//! Cart Records
//!
//! Typed view over a `cart` record and the total → minor-unit conversion.

use hooks_core::Record;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PaymentError, Result};

/// Collection holding carts
pub const CART_COLLECTION: &str = "cart";

pub const FIELD_PAYMENT_METHOD: &str = "payment_method";
pub const FIELD_TOTAL: &str = "total";
pub const FIELD_IS_PAID: &str = "is_paid";
pub const FIELD_PAYMENT_LINK: &str = "payment_link";

/// Supported payment methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    /// Accepted on carts but no checkout is created yet
    Paypal,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            other => Err(PaymentError::UnsupportedPaymentMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated cart
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cart {
    pub id: String,
    pub payment_method: PaymentMethod,
    /// Total as submitted, e.g. `"19.99"`
    pub total: String,
    /// Total in minor units (cents)
    pub amount_minor: i64,
    pub is_paid: bool,
    pub payment_link: String,
}

impl Cart {
    /// Validate a cart record: total must be a non-negative decimal and the
    /// payment method must be known.
    pub fn from_record(record: &Record) -> Result<Self> {
        let total = record.get_string(FIELD_TOTAL);
        let amount_minor = amount_in_cents(&total)?;
        let payment_method = record.get_string(FIELD_PAYMENT_METHOD).parse()?;

        Ok(Self {
            id: record.id.clone(),
            payment_method,
            total,
            amount_minor,
            is_paid: record.get_bool(FIELD_IS_PAID),
            payment_link: record.get_string(FIELD_PAYMENT_LINK),
        })
    }
}

/// Convert a decimal total to cents: `round(100 * total)`, halves away from zero.
pub fn amount_in_cents(total: &str) -> Result<i64> {
    let trimmed = total.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::InvalidAmount("total is empty".into()));
    }

    let value = Decimal::from_str(trimmed)
        .map_err(|e| PaymentError::InvalidAmount(format!("'{trimmed}': {e}")))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PaymentError::InvalidAmount(format!("'{trimmed}' is negative")));
    }

    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .map(i64::abs)
        .ok_or_else(|| PaymentError::InvalidAmount(format!("'{trimmed}' is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_in_cents() {
        assert_eq!(amount_in_cents("19.99").unwrap(), 1999);
        assert_eq!(amount_in_cents("10").unwrap(), 1000);
        assert_eq!(amount_in_cents(" 0.5 ").unwrap(), 50);
        assert_eq!(amount_in_cents("0").unwrap(), 0);
        assert_eq!(amount_in_cents("-0").unwrap(), 0);
    }

    #[test]
    fn test_amount_rounds_half_away_from_zero() {
        assert_eq!(amount_in_cents("0.005").unwrap(), 1);
        assert_eq!(amount_in_cents("0.004").unwrap(), 0);
        assert_eq!(amount_in_cents("19.995").unwrap(), 2000);
        assert_eq!(amount_in_cents("2.675").unwrap(), 268);
    }

    #[test]
    fn test_amount_matches_hundredths_for_every_cent_value() {
        for cents in 0..20_000i64 {
            let total = format!("{}.{:02}", cents / 100, cents % 100);
            assert_eq!(amount_in_cents(&total).unwrap(), cents, "total {total}");
        }
    }

    #[test]
    fn test_amount_rejects_invalid_totals() {
        for total in ["", "abc", "-1", "-0.01", "1,00", "NaN"] {
            assert!(
                matches!(amount_in_cents(total), Err(PaymentError::InvalidAmount(_))),
                "total {total:?} should be rejected"
            );
        }
        assert!(matches!(
            amount_in_cents("79228162514264337593543950335"),
            Err(PaymentError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("stripe".parse::<PaymentMethod>().unwrap(), PaymentMethod::Stripe);
        assert_eq!(" PayPal ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Paypal);
        assert!(matches!(
            "bitcoin".parse::<PaymentMethod>(),
            Err(PaymentError::UnsupportedPaymentMethod(_))
        ));
    }

    #[test]
    fn test_cart_from_record() {
        let record = Record::new(CART_COLLECTION)
            .with_id("c1")
            .with_field(FIELD_TOTAL, "19.99")
            .with_field(FIELD_PAYMENT_METHOD, "stripe");

        let cart = Cart::from_record(&record).unwrap();
        assert_eq!(cart.id, "c1");
        assert_eq!(cart.amount_minor, 1999);
        assert_eq!(cart.payment_method, PaymentMethod::Stripe);
        assert!(!cart.is_paid);
        assert!(cart.payment_link.is_empty());
    }

    #[test]
    fn test_cart_total_may_be_a_number() {
        let record = Record::new(CART_COLLECTION)
            .with_id("c2")
            .with_field(FIELD_TOTAL, 12.5)
            .with_field(FIELD_PAYMENT_METHOD, "paypal");
        assert_eq!(Cart::from_record(&record).unwrap().amount_minor, 1250);
    }
}

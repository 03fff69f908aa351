//! Conversion between stored minor units and API decimals
//!
//! Amounts are stored as minor units (cents). The API edge renders and
//! accepts them as `rust_decimal::Decimal` values such as "45.50".

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount has more than two decimal places: {0}")]
    TooPrecise(Decimal),

    #[error("Amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("Amount out of range: {0}")]
    OutOfRange(Decimal),
}

/// Minor units as a two-decimal value
pub fn minor_to_decimal(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, 2)
}

/// Render minor units as a two-decimal string
pub fn format_minor(amount_minor: i64) -> String {
    minor_to_decimal(amount_minor).to_string()
}

/// Convert a non-negative amount with at most two decimal places into minor units
pub fn decimal_to_minor(amount: Decimal) -> Result<i64, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }
    if amount.normalize().scale() > 2 {
        return Err(AmountError::TooPrecise(amount));
    }

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(AmountError::OutOfRange(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_minor() {
        assert_eq!(format_minor(0), "0.00");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(4550), "45.50");
        assert_eq!(format_minor(16850), "168.50");
        assert_eq!(format_minor(-300), "-3.00");
    }

    #[test]
    fn test_decimal_to_minor_valid() {
        assert_eq!(decimal_to_minor(dec("45.50")), Ok(4550));
        assert_eq!(decimal_to_minor(dec("45.5")), Ok(4550));
        assert_eq!(decimal_to_minor(dec("120")), Ok(12000));
        assert_eq!(decimal_to_minor(dec("0.75")), Ok(75));
        // Trailing zeros beyond the cent are not extra precision
        assert_eq!(decimal_to_minor(dec("3.000")), Ok(300));
        assert_eq!(decimal_to_minor(dec("0")), Ok(0));
    }

    #[test]
    fn test_decimal_to_minor_invalid() {
        assert_eq!(
            decimal_to_minor(dec("-1.00")),
            Err(AmountError::Negative(dec("-1.00")))
        );
        assert_eq!(
            decimal_to_minor(dec("1.005")),
            Err(AmountError::TooPrecise(dec("1.005")))
        );
        assert!(matches!(
            decimal_to_minor(Decimal::MAX),
            Err(AmountError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_minor_to_decimal_keeps_cents_scale() {
        assert_eq!(minor_to_decimal(16850), dec("168.50"));
        assert_eq!(minor_to_decimal(16850).scale(), 2);
    }
}

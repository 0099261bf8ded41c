//! Canonical wire rendering of decimal quantities.
//!
//! Every size and price that ends up in a signed payload goes through this
//! module exactly once, immediately before the payload is built. Rounding is
//! half-away-from-zero (`RoundingStrategy::MidpointAwayFromZero`) everywhere.

use crate::core::errors::ExchangeError;
use num_traits::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round `value` to `precision` decimal places, half away from zero.
pub fn round_decimal(value: Decimal, precision: u32) -> Decimal {
    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Render `value` rounded to `precision` decimals: plain notation, no
/// trailing fractional zeros, and any zero (including `-0`) as `"0"`.
pub fn format_decimal(value: Decimal, precision: u32) -> String {
    let rounded = round_decimal(value, precision);
    if rounded.is_zero() {
        return "0".to_string();
    }
    rounded.normalize().to_string()
}

/// Floating-point entry point of the formatter.
pub fn format_f64(value: f64, precision: u32) -> Result<String, ExchangeError> {
    if !value.is_finite() {
        return Err(ExchangeError::InvalidParameters(format!(
            "Cannot format non-finite value {}",
            value
        )));
    }
    let decimal = Decimal::from_f64(value).ok_or_else(|| {
        ExchangeError::InvalidParameters(format!("Value {} is out of decimal range", value))
    })?;
    Ok(format_decimal(decimal, precision))
}

/// Round to `figures` significant figures. Integer digits are never dropped,
/// so values with more integer digits than `figures` round to an integer.
pub fn round_significant(value: Decimal, figures: u32) -> Decimal {
    if value.is_zero() || figures == 0 {
        return Decimal::ZERO;
    }

    let abs = value.abs();
    let decimals = if abs >= Decimal::ONE {
        let integer_digits = abs.trunc().normalize().to_string().len() as u32;
        figures.saturating_sub(integer_digits)
    } else {
        let mut leading_zeros = 0u32;
        let mut scaled = abs;
        let tenth = Decimal::new(1, 1);
        while scaled < tenth {
            scaled *= Decimal::TEN;
            leading_zeros += 1;
        }
        leading_zeros + figures
    };

    round_decimal(value, decimals)
}

/// Number of decimal places implied by a step size such as `"0.0010"`.
pub fn decimals_of(step: Decimal) -> u32 {
    step.normalize().scale()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_strips_trailing_zeros() {
        assert_eq!(format_f64(1.5, 6).unwrap(), "1.5");
        assert_eq!(format_decimal(dec!(1.50000000), 8), "1.5");
        assert_eq!(format_decimal(dec!(2.00000000), 8), "2");
    }

    #[test]
    fn test_negative_zero_collapses() {
        assert_eq!(format_f64(-0.0000001, 4).unwrap(), "0");
        assert_eq!(format_f64(-0.0, 2).unwrap(), "0");
        assert_eq!(format_decimal(dec!(-0.00004), 4), "0");
    }

    #[test]
    fn test_never_exponential() {
        let rendered = format_f64(123.456, 2).unwrap();
        assert_eq!(rendered, "123.46");
        assert!(!rendered.contains('e') && !rendered.contains('E'));

        let tiny = format_f64(0.00000012, 8).unwrap();
        assert_eq!(tiny, "0.00000012");

        let large = format_f64(1e15, 2).unwrap();
        assert_eq!(large, "1000000000000000");
    }

    #[test]
    fn test_half_away_from_zero() {
        assert_eq!(format_decimal(dec!(0.125), 2), "0.13");
        assert_eq!(format_decimal(dec!(-0.125), 2), "-0.13");
        assert_eq!(format_decimal(dec!(2.5), 0), "3");
    }

    #[test]
    fn test_deterministic() {
        let a = format_decimal(dec!(49500.123456), 3);
        let b = format_decimal(dec!(49500.123456), 3);
        assert_eq!(a, b);
        assert_eq!(a, "49500.123");
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(format_f64(f64::NAN, 2).is_err());
        assert!(format_f64(f64::INFINITY, 2).is_err());
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(dec!(1234.567), 5), dec!(1234.6));
        assert_eq!(round_significant(dec!(123456.7), 5), dec!(123457));
        assert_eq!(round_significant(dec!(0.000123456), 5), dec!(0.00012346));
        assert_eq!(round_significant(dec!(-0.5), 1), dec!(-0.5));
    }

    #[test]
    fn test_decimals_of_step() {
        assert_eq!(decimals_of(dec!(0.0010)), 3);
        assert_eq!(decimals_of(dec!(1)), 0);
        assert_eq!(decimals_of(dec!(0.10)), 1);
    }
}

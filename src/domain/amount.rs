//! Exact conversion between decimal amount strings and integer minor units.
//!
//! Amounts arrive as strings such as `"1500.00"` and are stored as a count of
//! minor units (cents). The conversion is done with exact decimal arithmetic so
//! that no binary floating point rounding can creep in. Digits past the second
//! fractional place are truncated toward zero, never rounded.

use bigdecimal::BigDecimal;
use std::str::FromStr;
use thiserror::Error;

pub const AMOUNT_INPUT_MAX_LEN: usize = 64;
const MINOR_UNITS_PER_MAJOR: i64 = 100;
const MAX_DECIMAL_SCALE: u64 = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount format: {0:?}")]
    Invalid(String),

    #[error("amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Converts a decimal (`"10.50"`, `"1.5e1"`) or rational (`"21/2"`) string into minor units.
///
/// `"10.999"` becomes `1099`; `"-1.005"` becomes `-100`. Zero and negative
/// results are returned as-is; callers decide whether they are acceptable.
pub fn to_minor_units(value: &str) -> Result<i64, AmountError> {
    if value.is_empty() || value.len() > AMOUNT_INPUT_MAX_LEN {
        return Err(AmountError::Invalid(value.to_string()));
    }

    let (numerator, denominator) = match value.split_once('/') {
        Some((num, den)) => (parse_decimal(value, num)?, parse_decimal(value, den)?),
        None => (parse_decimal(value, value)?, BigDecimal::from(1i64)),
    };

    if denominator == BigDecimal::from(0i64) {
        return Err(AmountError::Invalid(value.to_string()));
    }

    let scaled = numerator * BigDecimal::from(MINOR_UNITS_PER_MAJOR);
    truncated_quotient(&scaled, &denominator)
        .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
}

/// Renders minor units as a decimal string with exactly two fractional digits.
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let per_major = MINOR_UNITS_PER_MAJOR as u64;
    format!("{}{}.{:02}", sign, abs / per_major, abs % per_major)
}

// `[+-]digits[.digits][e[+-]digits]`. The decimal exponent is bounded so that
// a short input cannot expand into an enormous integer.
fn parse_decimal(original: &str, part: &str) -> Result<BigDecimal, AmountError> {
    let invalid = || AmountError::Invalid(original.to_string());

    let unsigned = part.strip_prefix(&['+', '-'][..]).unwrap_or(part);
    let (mantissa, exponent) = match unsigned.split_once(&['e', 'E'][..]) {
        Some((m, e)) => (m, Some(e)),
        None => (unsigned, None),
    };

    let mut seen_point = false;
    let mut seen_digit = false;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return Err(invalid()),
        }
    }
    if !seen_digit {
        return Err(invalid());
    }

    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(&['+', '-'][..]).unwrap_or(exponent);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
    }

    let decimal = BigDecimal::from_str(part).map_err(|_| invalid())?;
    let (_, scale) = decimal.as_bigint_and_exponent();
    if scale.unsigned_abs() > MAX_DECIMAL_SCALE {
        return Err(AmountError::OutOfRange(original.to_string()));
    }

    Ok(decimal)
}

/// Integer quotient of two decimals, truncated toward zero.
fn truncated_quotient(numerator: &BigDecimal, denominator: &BigDecimal) -> Option<i64> {
    let (_, num_scale) = numerator.as_bigint_and_exponent();
    let (_, den_scale) = denominator.as_bigint_and_exponent();
    let scale = num_scale.max(den_scale);

    // Bring both sides to a common scale so their digit integers share a unit.
    let (num, _) = numerator.with_scale(scale).as_bigint_and_exponent();
    let (den, _) = denominator.with_scale(scale).as_bigint_and_exponent();

    let quotient = num / den;
    i64::try_from(&quotient).ok()
}

//! Whole-coin decimal amounts.
//!
//! The node reports output values as integer units but expects fees and
//! recipient amounts as whole-coin decimal strings. Everything in between is
//! kept in integer units so that fee arithmetic never loses precision.

use crate::constants::{COIN, COIN_DECIMALS};
use crate::error::AmountError;

/// Parse a whole-coin decimal string (e.g. `"9.99"`) into units.
///
/// Accepts at most [`COIN_DECIMALS`] fractional digits. A leading `.` or a
/// trailing `.` is allowed (`".5"`, `"5."`), signs and exponents are not.
pub fn parse_coins(input: &str) -> Result<u64, AmountError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountError::Negative(s.to_string()));
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Malformed(s.to_string()));
    }
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::Malformed(s.to_string()));
    }
    if frac.len() > COIN_DECIMALS {
        return Err(AmountError::TooPrecise(s.to_string()));
    }

    let whole_units: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| AmountError::Overflow(s.to_string()))?
    };

    let frac_units: u64 = if frac.is_empty() {
        0
    } else {
        let digits: u64 = frac
            .parse()
            .map_err(|_| AmountError::Malformed(s.to_string()))?;
        digits * 10u64.pow((COIN_DECIMALS - frac.len()) as u32)
    };

    whole_units
        .checked_mul(COIN)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| AmountError::Overflow(s.to_string()))
}

/// Format units as a whole-coin decimal string with all eight fractional digits.
pub fn format_coins(units: u64) -> String {
    format!("{}.{:0width$}", units / COIN, units % COIN, width = COIN_DECIMALS)
}

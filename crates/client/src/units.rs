//! Conversion between user-entered ether amounts and contract wei amounts.

use alloy_primitives::utils::parse_ether;
use auction_types::{Wei, ETHER_DECIMALS};

use crate::error::ClientError;

/// Significant digits shown for amounts.
pub const SIGNIFICANT_DIGITS: usize = 4;

/// Parse a decimal ether amount (e.g. `"1.5"`) into wei.
pub fn parse_amount(input: &str) -> Result<Wei, ClientError> {
    let invalid = |reason: String| ClientError::InvalidAmount {
        input: input.to_string(),
        reason,
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty".into()));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("amount must not be negative".into()));
    }

    parse_ether(trimmed).map_err(|e| invalid(e.to_string()))
}

/// Format a wei amount as ether rounded to [`SIGNIFICANT_DIGITS`].
pub fn format_amount(amount: Wei) -> String {
    to_precision(amount, ETHER_DECIMALS, SIGNIFICANT_DIGITS)
}

/// Round `amount / 10^decimals` to `precision` significant digits.
///
/// Uses fixed notation when the decimal exponent lies in `-6..precision` and
/// exponential notation (`1.235e+4`, `1.000e-7`) otherwise. Ties round up.
/// The computation is exact for every `U256`.
pub fn to_precision(amount: Wei, decimals: u8, precision: usize) -> String {
    let precision = precision.max(1);

    let (digits, exponent) = if amount.is_zero() {
        (vec![0u8; precision], 0i64)
    } else {
        significant_digits(&amount.to_string(), decimals, precision)
    };

    let digits: String = digits.iter().map(|d| char::from(b'0' + d)).collect();

    if exponent < -6 || exponent >= precision as i64 {
        let (lead, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            lead.to_string()
        } else {
            format!("{}.{}", lead, rest)
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{}", mantissa, sign, exponent.abs())
    } else if exponent >= 0 {
        let (int, frac) = digits.split_at(exponent as usize + 1);
        if frac.is_empty() {
            int.to_string()
        } else {
            format!("{}.{}", int, frac)
        }
    } else {
        format!("0.{}{}", "0".repeat((-exponent - 1) as usize), digits)
    }
}

/// Leading `precision` digits of a non-zero decimal integer string, rounded,
/// with the decimal exponent of the first digit.
fn significant_digits(raw: &str, decimals: u8, precision: usize) -> (Vec<u8>, i64) {
    let bytes = raw.as_bytes();
    let mut exponent = bytes.len() as i64 - 1 - i64::from(decimals);

    let mut digits: Vec<u8> = (0..precision)
        .map(|i| bytes.get(i).map_or(0, |b| b - b'0'))
        .collect();

    if bytes.get(precision).is_some_and(|b| *b >= b'5') && round_up(&mut digits) {
        digits.insert(0, 1);
        digits.truncate(precision);
        exponent += 1;
    }

    (digits, exponent)
}

/// Add one unit in the last place. Returns true on carry out of the lead digit.
fn round_up(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    true
}

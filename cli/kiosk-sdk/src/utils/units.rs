//! Conversion between user-entered decimal amounts and the ledger's smallest
//! unit, at a fixed 18-decimal scale.
//!
//! The conversion is pure integer string arithmetic. Floating point would
//! silently round typical inputs ("0.1" is not representable) and change the
//! submitted integer.

use thiserror::Error;

/// Fixed decimal scale of the ledger's smallest unit.
pub const AMOUNT_DECIMALS: usize = 18;

const SCALE: u128 = 10u128.pow(AMOUNT_DECIMALS as u32);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount contains a non-digit character: {0:?}")]
    InvalidDigit(char),
    #[error("amount has more than {AMOUNT_DECIMALS} decimal places")]
    TooManyDecimals,
    #[error("amount is too large")]
    Overflow,
}

/// Parse a decimal amount ("1.5", "0.000000000000000001", "3") into base
/// units. Exact; rejects anything that cannot be represented.
pub fn parse_amount(input: &str) -> Result<u128, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Empty);
    }
    if fraction.len() > AMOUNT_DECIMALS {
        return Err(AmountError::TooManyDecimals);
    }
    if let Some(c) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(AmountError::InvalidDigit(c));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };

    // Right-pad the fraction to the full scale: "5" -> 5 * 10^17.
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        let parsed: u128 = fraction.parse().map_err(|_| AmountError::Overflow)?;
        parsed * 10u128.pow((AMOUNT_DECIMALS - fraction.len()) as u32)
    };

    whole
        .checked_mul(SCALE)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Format base units back into a decimal display string, trimming trailing
/// fractional zeros.
pub fn format_amount(amount: u128) -> String {
    let whole = amount / SCALE;
    let fraction = amount % SCALE;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = AMOUNT_DECIMALS;
    let fraction = format!("{fraction:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

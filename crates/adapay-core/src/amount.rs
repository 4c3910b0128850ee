//! ADA / lovelace conversions
//!
//! All arithmetic is integer lovelace. User input in ADA is parsed as a
//! decimal string and truncated past six fractional digits, so a conversion
//! never requests more than the user typed.

use crate::{Error, Result};
use adapay_params::protocol::LOVELACE_PER_ADA;
use adapay_params::LedgerLimits;

/// Fractional digits of one ADA
pub const ADA_DECIMALS: usize = 6;

/// Convert a decimal ADA string to lovelace, truncating extra precision.
///
/// `"12.3456789"` becomes `12_345_678`.
pub fn ada_to_lovelace(ada: &str) -> Result<u64> {
    let trimmed = ada.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("Amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(Error::InvalidAmount("Amount cannot be negative".to_string()));
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::InvalidAmount(format!("'{}' is not a number", ada)));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidAmount(format!("'{}' is not a decimal number", ada)));
    }

    let whole_ada: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| Error::AmountOverflow(format!("'{}' is too large", ada)))?
    };

    // Truncate, never round: the seventh digit onward is dropped.
    let kept = &fraction[..fraction.len().min(ADA_DECIMALS)];
    let mut fractional_lovelace: u64 = 0;
    for (position, digit) in kept.bytes().enumerate() {
        let scale = 10u64.pow((ADA_DECIMALS - 1 - position) as u32);
        fractional_lovelace += u64::from(digit - b'0') * scale;
    }

    let lovelace = whole_ada
        .checked_mul(LOVELACE_PER_ADA)
        .and_then(|l| l.checked_add(fractional_lovelace))
        .ok_or_else(|| Error::AmountOverflow(format!("'{}' is too large", ada)))?;

    if !LedgerLimits::standard().is_valid_amount(lovelace) {
        return Err(Error::InvalidAmount(format!(
            "{} ADA exceeds the maximum supply",
            trimmed
        )));
    }

    Ok(lovelace)
}

/// Render lovelace as ADA with six fixed decimals (`1_500_000` -> `"1.500000"`)
pub fn lovelace_to_ada(lovelace: u64) -> String {
    format!(
        "{}.{:0width$}",
        lovelace / LOVELACE_PER_ADA,
        lovelace % LOVELACE_PER_ADA,
        width = ADA_DECIMALS
    )
}

/// Checked sum of lovelace values
pub fn checked_sum<I>(values: I) -> Result<u64>
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().try_fold(0u64, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| Error::AmountOverflow("Value overflow".to_string()))
    })
}

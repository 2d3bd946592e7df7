//! Conversion between display units and ledger smallest units
//!
//! The ledger denominates amounts in integer smallest units (18 decimals).
//! Conversion to and from human-facing decimal values happens exactly once,
//! at the HTTP boundary; everything past the handlers works in smallest
//! units only.

use thiserror::Error;

/// Decimals carried by the ledger's native unit.
pub const LEDGER_DECIMALS: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Amount has more than {LEDGER_DECIMALS} decimal places")]
    TooPrecise,

    #[error("Amount is too large")]
    Overflow,
}

/// Parse a decimal display amount (e.g. `"1.5"`) into smallest units.
pub fn to_ledger_units(display: &str) -> Result<u128, UnitsError> {
    let trimmed = display.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
        return Err(UnitsError::Invalid(display.to_string()));
    }

    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(display.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(UnitsError::Invalid(display.to_string()));
    }
    if frac.len() > LEDGER_DECIMALS as usize {
        return Err(UnitsError::TooPrecise);
    }

    let whole_part: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| UnitsError::Overflow)?
    };

    let scale = 10u128.pow(LEDGER_DECIMALS);
    let mut frac_part: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| UnitsError::Overflow)?
    };
    frac_part *= 10u128.pow(LEDGER_DECIMALS - frac.len() as u32);

    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_part))
        .ok_or(UnitsError::Overflow)
}

/// Render smallest units as a decimal display string, trimming trailing
/// zeros from the fractional part.
pub fn to_display_units(amount: u128) -> String {
    let scale = 10u128.pow(LEDGER_DECIMALS);
    let whole = amount / scale;
    let frac = amount % scale;

    if frac == 0 {
        return whole.to_string();
    }

    let frac_str = format!("{:0width$}", frac, width = LEDGER_DECIMALS as usize);
    let trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", whole, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amount() {
        assert_eq!(to_ledger_units("10").unwrap(), 10_000_000_000_000_000_000);
    }

    #[test]
    fn test_fractional_amount() {
        assert_eq!(to_ledger_units("1.5").unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(to_ledger_units("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(to_ledger_units("").is_err());
        assert!(to_ledger_units("-1").is_err());
        assert!(to_ledger_units("1.2.3").is_err());
        assert!(to_ledger_units("abc").is_err());
        assert!(to_ledger_units(".").is_err());
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert_eq!(
            to_ledger_units("0.0000000000000000001"),
            Err(UnitsError::TooPrecise)
        );
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(to_display_units(10_000_000_000_000_000_000), "10");
        assert_eq!(to_display_units(1_500_000_000_000_000_000), "1.5");
        assert_eq!(to_display_units(1), "0.000000000000000001");
        assert_eq!(to_display_units(0), "0");
    }
}

//! Fixed-point asset amounts
//!
//! Balances are stored as integers scaled by the asset precision, so
//! `12.5` of an asset with precision 2 is held as `1250`.

/// Parse a decimal string against an asset precision
///
/// Fails when the string has more fractional digits than the precision
/// allows or does not fit in 128 bits.
pub fn parse_amount(value: &str, precision: u32) -> Result<u128, String> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("malformed amount '{}'", value));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("malformed amount '{}'", value));
    }
    if fraction.len() > precision as usize {
        return Err(format!(
            "amount '{}' has more than {} fractional digits",
            value, precision
        ));
    }

    let overflow = || format!("amount '{}' is too large", value);
    let scale = 10u128.checked_pow(precision).ok_or_else(overflow)?;
    let whole: u128 = whole.parse().map_err(|_| overflow())?;
    let padded = format!("{:0<width$}", fraction, width = precision as usize);
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Render a scaled amount with exactly `precision` fractional digits
pub fn format_amount(value: u128, precision: u32) -> String {
    if precision == 0 {
        return value.to_string();
    }
    let digits = format!("{:0>width$}", value, width = precision as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - precision as usize);
    format!("{}.{}", whole, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scales_by_precision() {
        assert_eq!(parse_amount("12.5", 2), Ok(1250));
        assert_eq!(parse_amount("12", 2), Ok(1200));
        assert_eq!(parse_amount("0.01", 2), Ok(1));
        assert_eq!(parse_amount("7", 0), Ok(7));
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        assert!(parse_amount("1.234", 2).is_err());
        assert!(parse_amount("1.5", 0).is_err());
        assert!(parse_amount("abc", 2).is_err());
        assert!(parse_amount(".5", 2).is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_amount(1250, 2), "12.50");
        assert_eq!(format_amount(1, 2), "0.01");
        assert_eq!(format_amount(42, 0), "42");
    }
}

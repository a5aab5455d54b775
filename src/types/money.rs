//! Fixed-point money helpers
//!
//! All monetary values in the engine are `rust_decimal::Decimal` with
//! 2 fraction digits. This module centralizes parsing and formatting so no
//! call site ever reaches for floating point.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of fraction digits carried by every monetary value
pub const MONEY_SCALE: u32 = 2;

/// Round a value to the monetary scale, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a monetary value as a decimal string with exactly 2 fraction digits
///
/// This is the canonical representation used in transfer results and ledger
/// metadata; two equal amounts always format to byte-identical strings.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

/// Parse a monetary amount from its string representation
///
/// Rejects values that are not valid decimals or that carry more than
/// 2 fraction digits. Sign and magnitude checks are the caller's concern.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_| format!("Invalid amount '{}'", raw.trim()))?;

    if value.scale() > MONEY_SCALE {
        return Err(format!(
            "Amount '{}' has more than {} fraction digits",
            raw.trim(),
            MONEY_SCALE
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Decimal::new(500, 2), "5.00")]
    #[case(Decimal::new(25, 0), "25.00")]
    #[case(Decimal::new(89750, 1), "8975.00")]
    #[case(Decimal::new(5025, 3), "5.03")] // 5.025 rounds away from zero
    #[case(Decimal::ZERO, "0.00")]
    fn test_format_amount(#[case] value: Decimal, #[case] expected: &str) {
        assert_eq!(format_amount(value), expected);
    }

    #[rstest]
    #[case("100.00", Decimal::new(10000, 2))]
    #[case("  1000.50  ", Decimal::new(100050, 2))]
    #[case("0.01", Decimal::new(1, 2))]
    #[case("-100.00", Decimal::new(-10000, 2))]
    fn test_parse_amount_valid(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(parse_amount(raw).unwrap(), expected);
    }

    #[rstest]
    #[case::not_a_number("abc")]
    #[case::empty("")]
    #[case::too_many_digits("1.001")]
    fn test_parse_amount_invalid(#[case] raw: &str) {
        assert!(parse_amount(raw).is_err());
    }
}

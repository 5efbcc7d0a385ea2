//! Money helpers shared by the pricing calculator and its callers.
//!
//! Parsing and rounding live here so that every caller coerces raw input
//! and formats amounts for display the same way.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use venue_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(667.275)), dec!(667.28));
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Reduces money text to a plain decimal literal.
///
/// Accepts an optional leading `-`, digits with optional comma thousands
/// groups (`1,234,567`) and an optional fraction. Returns `None` for
/// anything else, including misplaced commas, exponents and a leading `+`.
fn normalize_money_input(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    if fraction.is_some_and(|fraction| !all_digits(fraction)) {
        return None;
    }
    if whole.is_empty() && fraction.is_none_or(str::is_empty) {
        return None;
    }

    let mut groups = whole.split(',');
    let lead = groups.next().unwrap_or_default();
    let grouped = whole.contains(',');
    if !all_digits(lead) || (grouped && !(1..=3).contains(&lead.len())) {
        return None;
    }
    if !groups.all(|group| group.len() == 3 && all_digits(group)) {
        return None;
    }

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    if negative {
        normalized.push('-');
    }
    if whole.is_empty() {
        normalized.push('0');
    } else {
        normalized.extend(whole.chars().filter(|c| *c != ','));
    }
    if let Some(fraction) = fraction.filter(|fraction| !fraction.is_empty()) {
        normalized.push('.');
        normalized.push_str(fraction);
    }
    Some(normalized)
}

/// Parses a user-entered amount, falling back to zero.
///
/// Empty, whitespace-only, malformed and negative input all yield
/// `Decimal::ZERO`; this never fails, so a live price preview can be
/// recomputed on every keystroke. Comma thousands separators are accepted
/// only in proper groups of three; exponents, currency symbols and a
/// leading `+` are not.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use venue_core::calculations::common::parse_money_or_zero;
///
/// assert_eq!(parse_money_or_zero("1,250.50"), dec!(1250.50));
/// assert_eq!(parse_money_or_zero(""), Decimal::ZERO);
/// assert_eq!(parse_money_or_zero("abc"), Decimal::ZERO);
/// assert_eq!(parse_money_or_zero("1,2,3"), Decimal::ZERO);
/// assert_eq!(parse_money_or_zero("-20"), Decimal::ZERO);
/// ```
pub fn parse_money_or_zero(s: &str) -> Decimal {
    if s.trim().is_empty() {
        return Decimal::ZERO;
    }
    let Some(normalized) = normalize_money_input(s) else {
        tracing::debug!(input = %s, "amount is not a plain number, using zero");
        return Decimal::ZERO;
    };
    match Decimal::from_str(&normalized) {
        Ok(value) if value > Decimal::ZERO => value,
        Ok(_) => Decimal::ZERO,
        Err(e) => {
            tracing::debug!(input = %s, "amount out of range, using zero: {}", e);
            Decimal::ZERO
        }
    }
}

/// Formats an amount for display: rounded half-up and padded to two places,
/// prefixed with `symbol`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use venue_core::calculations::common::format_amount;
///
/// assert_eq!(format_amount(dec!(667.275), "$"), "$667.28");
/// assert_eq!(format_amount(dec!(90), "$"), "$90.00");
/// ```
pub fn format_amount(
    value: Decimal,
    symbol: &str,
) -> String {
    let mut rounded = round_half_up(value);
    rounded.rescale(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{}", symbol, rounded.abs())
    } else {
        format!("{}{}", symbol, rounded.abs())
    }
}

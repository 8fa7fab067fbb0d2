//! Input parsing and validation helpers
//!
//! Numeric fields arrive as free text from forms and spreadsheets, so parsing
//! is deliberately forgiving about currency symbols and thousands separators.

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Money is stored with 12 integer digits and 2 decimals
const MONEY_INTEGER_DIGITS: u32 = 12;

/// Parse a money amount, dropping every character except digits, `.` and `-`.
///
/// `"₹1,299.50"` parses as `1299.50`; blank or unparsable input yields `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Parse a whole-number quantity with the same leniency as [`parse_amount`].
/// Fractional values are rejected.
pub fn parse_quantity(raw: &str) -> Option<i32> {
    let value = parse_amount(raw)?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_i32()
}

/// Whether an amount fits a stored money column once rounded to cents
pub fn amount_in_range(amount: Decimal) -> bool {
    let limit = Decimal::from(10u64.pow(MONEY_INTEGER_DIGITS));
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs()
        < limit
}

/// Parse a calendar date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("Invalid email format"),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Validate a client-supplied idempotency key
pub fn validate_idempotency_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() || key.len() > 128 {
        return Err("Idempotency key must be 1-128 characters");
    }
    if !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Idempotency key must be printable ASCII");
    }
    Ok(())
}

/// Escape `%`, `_` and `\` so user text matches literally in a `LIKE ... ESCAPE '\'` pattern
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive substring pattern for a search term, or `None` when the term is blank
pub fn contains_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", escape_like(t)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_strips_symbols() {
        assert_eq!(parse_amount("₹1,299.50"), Some(Decimal::new(129950, 2)));
        assert_eq!(parse_amount(" 42 "), Some(Decimal::from(42)));
        assert_eq!(parse_amount("-3"), Some(Decimal::from(-3)));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("1.2.3"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("12"), Some(12));
        assert_eq!(parse_quantity("12.00"), Some(12));
        assert_eq!(parse_quantity("1,000 pcs"), Some(1000));
        assert_eq!(parse_quantity("-4"), Some(-4));
        assert_eq!(parse_quantity("2.5"), None);
        assert_eq!(parse_quantity("99999999999"), None);
    }

    #[test]
    fn test_amount_in_range() {
        assert!(amount_in_range(Decimal::new(99_999_999_999_999, 2)));
        assert!(amount_in_range(Decimal::new(-99_999_999_999_999, 2)));
        assert!(!amount_in_range(Decimal::from(1_000_000_000_000u64)));
        // Rounds up to 10^12 on storage
        assert!(!amount_in_range(Decimal::new(999_999_999_999_995, 3)));
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert_eq!(parse_date("2026-03-01"), expected);
        assert_eq!(parse_date("2026-03-01T10:00:00Z"), expected);
        assert_eq!(parse_date("01/03/2026"), None);
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@shop.in").is_ok());
        assert!(validate_email("owner@shop").is_err());
        assert!(validate_email("@shop.in").is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("INV-0001"), "INV-0001");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(contains_pattern(Some("  ")), None);
        assert_eq!(contains_pattern(Some(" ref ")), Some("%ref%".to_string()));
    }

    #[test]
    fn test_validate_idempotency_key() {
        assert!(validate_idempotency_key("9f1c-2a77").is_ok());
        assert!(validate_idempotency_key("").is_err());
        assert!(validate_idempotency_key("has space").is_err());
        assert!(validate_idempotency_key(&"k".repeat(129)).is_err());
    }
}

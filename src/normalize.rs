//! Locale-aware parsing of amounts and dates.
//!
//! Bank exports disagree on almost everything: `1.234,56` vs `1,234.56`,
//! `(12.00)` vs `-12.00`, `31/01/2026` vs `2026-01-31`. The decimal
//! separator is configuration, never guessed.

use crate::error::ValueError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Date formats tried in order when a profile does not list its own.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d", "%Y%m%d",
];

/// Time suffixes accepted after a date by [`parse_date_time`].
const TIME_SUFFIXES: &[&str] = &[" %H:%M:%S", " %H:%M", "T%H:%M:%S"];

/// Largest magnitude [`parse_amount`] accepts.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₽', '₩', '₺', '₴', '₪', '¢'];

/// Parses a locale-formatted amount.
///
/// `decimal_separator` is `,` or `.`; the other one (and `'`) is treated as
/// a thousands grouping mark. Magnitudes above [`MAX_AMOUNT`] are rejected.
pub fn parse_amount(raw: &str, decimal_separator: char) -> Result<Decimal, ValueError> {
    let invalid = || ValueError::InvalidAmount(raw.to_string());

    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let s = strip_currency_code(&compact);

    let (mut negative, s) = match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };

    let s = if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        rest
    } else if let Some(rest) = s.strip_prefix('+') {
        rest
    } else if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        rest
    } else {
        s
    };

    let grouping = if decimal_separator == ',' { '.' } else { ',' };
    let (int_part, frac_part) = match s.split_once(decimal_separator) {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (s, None),
    };

    let mut digits = ungroup(int_part, grouping).ok_or_else(invalid)?;
    if let Some(frac) = frac_part {
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.push('.');
        digits.push_str(frac);
    }

    if !digits.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let value = Decimal::from_str(&digits).map_err(|_| invalid())?;
    if value > Decimal::new(MAX_AMOUNT, 0) {
        return Err(invalid());
    }
    Ok(if negative { -value } else { value })
}

/// Removes thousands grouping from the integer part of an amount.
///
/// Grouping marks are only accepted between groups of three digits, so
/// `1,5` is rejected rather than read as `15`.
fn ungroup(int_part: &str, grouping: char) -> Option<String> {
    let groups: Vec<&str> = int_part.split(|c| c == grouping || c == '\'').collect();
    if !groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    if let Some((first, rest)) = groups.split_first() {
        let well_formed =
            !first.is_empty() && first.len() <= 3 && rest.iter().all(|g| g.len() == 3);
        if !rest.is_empty() && !well_formed {
            return None;
        }
    }
    Some(groups.concat())
}

/// Strips a three-letter ISO 4217 code such as `EUR` from either end.
fn strip_currency_code(s: &str) -> &str {
    let is_code = |part: &str| part.len() == 3 && part.chars().all(|c| c.is_ascii_uppercase());

    if s.len() > 3 {
        if let (Some(head), Some(tail)) = (s.get(..3), s.get(3..)) {
            if is_code(head) {
                return tail;
            }
        }
        if let (Some(head), Some(tail)) = (s.get(..s.len() - 3), s.get(s.len() - 3..)) {
            if is_code(tail) {
                return head;
            }
        }
    }
    s
}

/// Renders `value` in the given locale with thousands grouping.
///
/// The output always parses back to the same value with [`parse_amount`].
pub fn format_amount(value: Decimal, decimal_separator: char) -> String {
    let grouping = if decimal_separator == ',' { '.' } else { ',' };
    let rendered = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(grouping);
        }
        grouped.push(c);
    }

    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}{}{}", sign, grouped, decimal_separator, frac_part)
}

/// Parses a calendar date, trying `formats` in order.
///
/// The first format that matches the whole string wins. Impossible dates
/// such as `31/04/2026` never match.
pub fn parse_date<S: AsRef<str>>(raw: &str, formats: &[S]) -> Result<NaiveDate, ValueError> {
    let trimmed = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt.as_ref()).ok())
        .ok_or_else(|| ValueError::InvalidDate(raw.to_string()))
}

/// Parses a date that may carry a time of day.
///
/// Returns the time only when the source had one, so callers can tell
/// "midnight" apart from "no time given".
pub fn parse_date_time<S: AsRef<str>>(
    raw: &str,
    formats: &[S],
) -> Result<(NaiveDate, Option<NaiveTime>), ValueError> {
    if let Ok(date) = parse_date(raw, formats) {
        return Ok((date, None));
    }

    let trimmed = raw.trim();
    for fmt in formats {
        for suffix in TIME_SUFFIXES {
            let full = format!("{}{}", fmt.as_ref(), suffix);
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, &full) {
                return Ok((dt.date(), Some(dt.time())));
            }
        }
    }

    Err(ValueError::InvalidDate(raw.to_string()))
}

/// Parses a standalone time-of-day column.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ValueError> {
    let trimmed = raw.trim();
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ValueError::InvalidDate(raw.to_string()))
}

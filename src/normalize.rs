// src/normalize.rs
//! Turns scraped cell text into numbers.
//!
//! Handles thousands separators, Persian and Arabic-Indic digits, the `-`
//! placeholder and a single trailing magnitude suffix (`B`, `M`, `K`).
//! Suffix expansion is done on the decimal string itself so `"19.4M"` becomes
//! exactly `19400000` instead of going through a lossy float multiply.

use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const PLACEHOLDER: &str = "-";

/// Magnitude suffixes in match priority order.
const SUFFIXES: [(char, usize); 3] = [('B', 9), ('M', 6), ('K', 3)];

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("static decimal pattern"));

/// Maps Persian/Arabic-Indic digits and separators onto ASCII, dropping
/// whitespace, bidi marks and thousands separators.
fn strip_locale(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '۰'..='۹' => char::from_digit(c as u32 - '۰' as u32, 10),
            '٠'..='٩' => char::from_digit(c as u32 - '٠' as u32, 10),
            '٫' => Some('.'),
            ',' | '٬' => None,
            '\u{200c}' | '\u{200e}' | '\u{200f}' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect()
}

fn expand_magnitude(body: &str, exponent: usize) -> String {
    let (negative, unsigned) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body.strip_prefix('+').unwrap_or(body)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut digits = String::with_capacity(int_part.len() + exponent + 1);
    digits.push_str(int_part);
    if frac_part.len() <= exponent {
        digits.push_str(frac_part);
        digits.extend(std::iter::repeat('0').take(exponent - frac_part.len()));
    } else {
        digits.push_str(&frac_part[..exponent]);
        digits.push('.');
        digits.push_str(&frac_part[exponent..]);
    }

    let trimmed = digits.trim_start_matches('0');
    let numeral = if trimmed.is_empty() || trimmed.starts_with('.') {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };

    if negative {
        format!("-{}", numeral)
    } else {
        numeral
    }
}

/// Cleans a decimal field and expands any magnitude suffix.
///
/// Returns `Ok(None)` for empty or placeholder input, meaning the field is
/// absent rather than zero. More than one suffix character, or a suffix that
/// is not the last character, is rejected.
pub fn clean_decimal_text(text: &str) -> Result<Option<String>, ParseError> {
    let cleaned = strip_locale(text);
    if cleaned.is_empty() || cleaned == PLACEHOLDER {
        return Ok(None);
    }

    let suffix_count = cleaned
        .chars()
        .filter(|c| SUFFIXES.iter().any(|(s, _)| s == c))
        .count();

    let (body, exponent) = match suffix_count {
        0 => (cleaned.as_str(), None),
        1 => {
            let last = cleaned.chars().last();
            match SUFFIXES.iter().find(|(s, _)| Some(*s) == last) {
                Some((s, exp)) => (&cleaned[..cleaned.len() - s.len_utf8()], Some(*exp)),
                None => return Err(ParseError::AmbiguousSuffix(text.to_string())),
            }
        }
        _ => return Err(ParseError::AmbiguousSuffix(text.to_string())),
    };

    if !DECIMAL_RE.is_match(body) {
        return Err(ParseError::NotNumeric(text.to_string()));
    }

    Ok(Some(match exponent {
        Some(exp) => expand_magnitude(body, exp),
        None => body.strip_prefix('+').unwrap_or(body).to_string(),
    }))
}

/// Parses a possibly abbreviated count such as `"980.3 K"`.
///
/// Empty and placeholder input count as zero. Any fractional remainder left
/// after suffix expansion is truncated.
pub fn parse_abbreviated_count(text: &str) -> Result<u64, ParseError> {
    let numeral = match clean_decimal_text(text)? {
        Some(numeral) => numeral,
        None => return Ok(0),
    };
    if numeral.starts_with('-') {
        return Err(ParseError::Negative(text.to_string()));
    }

    let int_part = numeral.split('.').next().unwrap_or("");
    if int_part.is_empty() {
        return Ok(0);
    }
    int_part
        .parse::<u64>()
        .map_err(|_| ParseError::OutOfRange(text.to_string()))
}

pub fn parse_decimal(text: &str) -> Result<Option<f64>, ParseError> {
    match clean_decimal_text(text)? {
        Some(numeral) => numeral
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParseError::NotNumeric(text.to_string())),
        None => Ok(None),
    }
}

/// Same as [`parse_decimal`] after dropping a trailing percent sign.
pub fn parse_percent(text: &str) -> Result<Option<f64>, ParseError> {
    let trimmed = text.trim();
    let without_sign = trimmed
        .strip_suffix('%')
        .or_else(|| trimmed.strip_suffix('٪'))
        .unwrap_or(trimmed);
    parse_decimal(without_sign)
}

/// Rescales a price expressed in a larger currency unit into the finer unit.
pub fn to_money(price_like: f64, scale_factor: f64) -> f64 {
    price_like * scale_factor
}

/// Collects every decimal digit in a label, e.g. `"1,234,000 تومان"` -> 1234000.
pub fn digits_only(text: &str) -> Option<u64> {
    let digits: String = strip_locale(text)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

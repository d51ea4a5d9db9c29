//! US phone number normalization and display formatting

use regex::Regex;
use std::sync::OnceLock;

fn phone_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^\+?[0-9().\-\s]+$").expect("phone pattern is valid"))
}

/// Normalize a US phone number to its ten digits.
///
/// Accepts `(555) 123-4567`, `555.123.4567`, `555 123 4567`, `+1 555-123-4567`
/// and similar. Returns `None` unless exactly ten digits remain after an
/// optional leading country code `1` is stripped.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !phone_shape().is_match(raw) {
        return None;
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = match digits.len() {
        10 if !raw.starts_with('+') => digits,
        11 if digits.starts_with('1') => digits[1..].to_string(),
        _ => return None,
    };

    Some(national)
}

/// Render a phone number as `(XXX) XXX-XXXX`, or return it unchanged if it
/// does not normalize
pub fn format_phone(phone: &str) -> String {
    match normalize_phone(phone) {
        Some(d) => format!("({}) {}-{}", &d[0..3], &d[3..6], &d[6..]),
        None => phone.to_string(),
    }
}

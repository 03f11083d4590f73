//! Numeric literal recognition and spreadsheet rounding

use lazy_regex::regex_is_match;

/// Returns true if `s` is a plain decimal literal: optional `-`, digits with an
/// optional fractional part, or a bare fraction like `.45`.
///
/// Exponents, `+` signs and surrounding whitespace are not accepted.
pub fn is_numeric(s: &str) -> bool {
    regex_is_match!(r"^-?(?:\d+\.?\d*|\.\d+)$", s)
}

/// Parse a plain decimal literal, `None` if [`is_numeric`] rejects it
pub fn parse_numeric(s: &str) -> Option<f64> {
    if !is_numeric(s) {
        return None;
    }
    s.parse().ok()
}

/// Round `value` to `places` decimal places, half away from zero
///
/// `places = 0` rounds to an integer, `places = 1` keeps one decimal, and negative
/// places round to the left of the decimal point (`-1` rounds to tens). Fractional
/// `places` are truncated toward zero.
pub fn round_to_places(value: f64, places: f64) -> f64 {
    let places = places.trunc() as i32;
    // Negative places scale by a whole power of ten
    if places >= 0 {
        let factor = 10_f64.powi(places);
        (value * factor).round() / factor
    } else {
        let factor = 10_f64.powi(places.saturating_neg());
        (value / factor).round() * factor
    }
}

//! Human-readable memory sizes such as `512m`, `1GB` or `2.5 GiB`.
//!
//! All suffixes are binary multiples (`1k == 1024`), matching the way
//! container engines interpret memory limits.

use crate::error::{Result, TugboatError};

const KIB: f64 = 1024.0;

/// Parses a memory size into bytes.
///
/// Accepts an optional single space between the number and the unit, a
/// case-insensitive unit letter (`k`, `m`, `g`, `t`, `p`), and an optional
/// trailing `i` and/or `b`.
///
/// # Errors
///
/// Returns `TugboatError::Config` if the text is not a valid size.
pub fn parse_bytes(text: &str) -> Result<i64> {
    let invalid = || TugboatError::Config {
        message: format!("invalid size: '{text}'"),
    };

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, rest) = text.split_at(split);
    if number.is_empty() || number.starts_with('.') || number.ends_with('.') {
        return Err(invalid());
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let rest = rest.strip_prefix(' ').unwrap_or(rest).to_ascii_lowercase();
    let mut chars = rest.chars().peekable();
    let multiplier = match chars.peek() {
        Some('k') => KIB,
        Some('m') => KIB.powi(2),
        Some('g') => KIB.powi(3),
        Some('t') => KIB.powi(4),
        Some('p') => KIB.powi(5),
        _ => 1.0,
    };
    if multiplier > 1.0 {
        let _ = chars.next();
        if chars.peek() == Some(&'i') {
            let _ = chars.next();
        }
    }
    if chars.peek() == Some(&'b') {
        let _ = chars.next();
    }
    if chars.next().is_some() {
        return Err(invalid());
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok((value * multiplier) as i64)
}

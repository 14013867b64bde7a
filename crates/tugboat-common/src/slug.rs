//! URL-safe slugs for container, volume, and network names.
//!
//! A slug contains only lowercase ASCII letters, digits, `-` and `_`,
//! and neither starts nor ends with a separator.

/// Converts arbitrary text into a slug.
///
/// Letters are lowercased, every run of disallowed characters collapses
/// into a single `-`, and leading or trailing separators are trimmed.
#[must_use]
pub fn make(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            if pending_dash && !out.is_empty() && !out.ends_with('-') && c != '-' {
                out.push('-');
            }
            pending_dash = false;
            if c == '-' && out.ends_with('-') {
                continue;
            }
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Returns `true` if the text is already a valid slug.
#[must_use]
pub fn is_slug(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    let last = text.chars().last().unwrap_or(first);
    if matches!(first, '-' | '_') || matches!(last, '-' | '_') {
        return false;
    }
    text.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

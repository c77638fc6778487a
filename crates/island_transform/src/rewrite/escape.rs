//! Quoting helpers for generated markup and expressions.
//!
//! Pure functions with no dependency on rewriter state.

use cow_utils::CowUtils;

/// Render `s` as a double-quoted JavaScript string literal.
///
/// Escapes backslashes, double quotes and line terminators, so that the
/// literal value equals `s` once evaluated.
pub fn js_string_literal(s: &str) -> String {
    let s = s.cow_replace('\\', "\\\\");
    let s = s.cow_replace('"', "\\\"");
    let s = s.cow_replace('\n', "\\n");
    let s = s.cow_replace('\r', "\\r");
    let s = s.cow_replace('\u{2028}', "\\u2028");
    let s = s.cow_replace('\u{2029}', "\\u2029");
    format!("\"{s}\"")
}

/// Whether `s` can be used as an object key without quotes.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Render an object-literal key, quoting it when it is not an identifier
/// (e.g. `data-id` or `aria-label`).
pub fn object_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        js_string_literal(key)
    }
}

/// Quote a generated attribute value.
///
/// `&` is always written as `&amp;`. Uses double quotes when possible, single
/// quotes when the value contains double quotes only, and `&quot;` otherwise.
/// Template compilers decode entities in attribute values, so all three forms
/// carry the same value.
pub fn quote_attribute_value(value: &str) -> String {
    let value = value.cow_replace('&', "&amp;");
    if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        format!("\"{}\"", value.cow_replace('"', "&quot;"))
    }
}

/// Convert a u64 hash to a lowercase alphanumeric string (similar to base32)
pub fn to_base32_like(hash: u64) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut result = String::with_capacity(8);
    let mut h = hash;
    for _ in 0..8 {
        let idx = (h & 0x1f) as usize;
        result.push(ALPHABET[idx] as char);
        h >>= 5;
    }
    result
}

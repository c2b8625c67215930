//! Text filtering ahead of translation

use crate::vision::TextRegion;

/// Whether `text` is worth translating.
///
/// Trimmed text shorter than `min_length` characters, text made only of
/// digits and text without any letter or digit are rejected.
pub fn is_translatable(text: &str, min_length: usize) -> bool {
    let text = text.trim();

    if text.chars().count() < min_length {
        return false;
    }
    if !text.is_empty() && text.chars().all(is_digit) {
        return false;
    }
    text.chars().any(char::is_alphanumeric)
}

/// Decimal digits and digit forms such as superscripts or circled digits.
///
/// Letter numbers and fractions (`Ⅻ`, `〇`, `½`) count as text.
fn is_digit(c: char) -> bool {
    c.is_numeric()
        && !matches!(
            c,
            '\u{00BC}'..='\u{00BE}'
                | '\u{2150}'..='\u{218F}'
                | '\u{3007}'
                | '\u{3021}'..='\u{3029}'
                | '\u{3038}'..='\u{303A}'
                | '\u{16EE}'..='\u{16F0}'
        )
}

/// Keep the translatable regions, preserving order
pub fn filter_regions(regions: Vec<TextRegion>, min_length: usize) -> Vec<TextRegion> {
    regions
        .into_iter()
        .filter(|r| is_translatable(&r.text, min_length))
        .collect()
}

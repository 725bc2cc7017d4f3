//! Text folding shared by matching code.

/// Lower-cases and unifies Arabic/Persian letter variants (ي/ی, ك/ک).
pub(crate) fn fold(raw: &str) -> String {
    raw.trim().to_lowercase().replace('ي', "ی").replace('ك', "ک")
}

/// Maps Persian and Arabic-Indic digits to ASCII and drops separators.
pub(crate) fn normalize_phone(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            other => other,
        })
        .collect()
}

//! Closed bilingual color-name table.
//!
//! Free-text color names (English or Persian) normalize to a hex code before
//! they are stored. Hex codes pass through lower-cased; anything else is a
//! validation error.

use crate::action::ActionError;
use once_cell::sync::Lazy;
use std::collections::HashMap;

const COLOR_NAMES: &[(&str, &str)] = &[
    ("red", "#ef4444"),
    ("قرمز", "#ef4444"),
    ("orange", "#f97316"),
    ("نارنجی", "#f97316"),
    ("yellow", "#eab308"),
    ("زرد", "#eab308"),
    ("green", "#22c55e"),
    ("سبز", "#22c55e"),
    ("teal", "#14b8a6"),
    ("فیروزه‌ای", "#14b8a6"),
    ("فیروزه ای", "#14b8a6"),
    ("blue", "#3b82f6"),
    ("آبی", "#3b82f6"),
    ("purple", "#a855f7"),
    ("violet", "#a855f7"),
    ("بنفش", "#a855f7"),
    ("pink", "#ec4899"),
    ("صورتی", "#ec4899"),
    ("brown", "#92400e"),
    ("قهوه‌ای", "#92400e"),
    ("قهوه ای", "#92400e"),
    ("gray", "#6b7280"),
    ("grey", "#6b7280"),
    ("طوسی", "#6b7280"),
    ("خاکستری", "#6b7280"),
    ("black", "#000000"),
    ("مشکی", "#000000"),
    ("سیاه", "#000000"),
    ("white", "#ffffff"),
    ("سفید", "#ffffff"),
];

static COLOR_TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| COLOR_NAMES.iter().copied().collect());

/// Normalizes a color name or hex code to a lower-case `#rrggbb` string.
pub fn normalize_color(raw: &str) -> Result<String, ActionError> {
    let trimmed = raw.trim();
    if let Some(hex) = expand_hex(trimmed) {
        return Ok(hex);
    }
    let key = trimmed.to_lowercase().replace('ي', "ی").replace('ك', "ک");
    COLOR_TABLE
        .get(key.as_str())
        .map(|hex| hex.to_string())
        .ok_or_else(|| ActionError::validation("color", format!("unknown color '{trimmed}'")))
}

fn expand_hex(raw: &str) -> Option<String> {
    let digits = raw.strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => Some(format!("#{}", digits.to_lowercase())),
        3 => Some(format!(
            "#{}",
            digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_lowercase()
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_and_persian_names_resolve() {
        assert_eq!(normalize_color("Orange").unwrap(), "#f97316");
        assert_eq!(normalize_color("نارنجی").unwrap(), "#f97316");
        assert_eq!(normalize_color(" grey ").unwrap(), "#6b7280");
    }

    #[test]
    fn hex_codes_pass_through() {
        assert_eq!(normalize_color("#F97316").unwrap(), "#f97316");
        assert_eq!(normalize_color("#abc").unwrap(), "#aabbcc");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = normalize_color("ultraviolet").unwrap_err();
        assert!(err.is_validation());
        assert!(normalize_color("#12345").is_err());
    }
}

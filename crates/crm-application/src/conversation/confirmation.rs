//! Bilingual yes/no token matching for the confirmation sub-protocol.

use crate::text::fold;

const AFFIRMATIVE: &[&str] = &[
    "yes", "y", "ok", "okay", "confirm", "sure", "yep", "بله", "آره", "باشه", "تایید", "تأیید",
];

const NEGATIVE: &[&str] = &["no", "n", "cancel", "nope", "stop", "نه", "خیر", "لغو", "انصراف"];

/// Reading of a reply given while a change awaits confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    /// Neither token; treated as new slot data.
    Other,
}

impl ConfirmationReply {
    pub fn classify(text: &str) -> Self {
        let normalized = normalize(text);
        if AFFIRMATIVE.contains(&normalized.as_str()) {
            Self::Affirmative
        } else if NEGATIVE.contains(&normalized.as_str()) {
            Self::Negative
        } else {
            Self::Other
        }
    }
}

fn normalize(text: &str) -> String {
    let folded = fold(text);
    folded
        .trim_matches(|c: char| c.is_ascii_punctuation() || matches!(c, '؟' | '،' | '!' | '.'))
        .trim()
        .to_string()
}

//! Response language detection.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::text::is_arabic_letter;

/// Language a session is answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ar,
    #[default]
    En,
}

impl Language {
    /// Detects the language of a message.
    ///
    /// Any Arabic letter makes the message Arabic. Messages with no letters
    /// at all (numbers, punctuation) are undecided.
    pub fn detect(text: &str) -> Option<Self> {
        if text.chars().any(is_arabic_letter) {
            Some(Language::Ar)
        } else if text.chars().any(char::is_alphabetic) {
            Some(Language::En)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Ar => "ar",
            Language::En => "en",
        }
    }

    /// Picks the variant of a bilingual string.
    pub fn pick<'a>(&self, en: &'a str, ar: &'a str) -> &'a str {
        match self {
            Language::Ar => ar,
            Language::En => en,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arabic_wins_in_mixed_text() {
        assert_eq!(Language::detect("عايز اتعلم Python"), Some(Language::Ar));
    }

    #[test]
    fn latin_text_is_english() {
        assert_eq!(Language::detect("learn sql"), Some(Language::En));
    }

    #[test]
    fn digits_only_are_undecided() {
        assert_eq!(Language::detect("8"), None);
        assert_eq!(Language::detect("٣"), None);
    }

    #[test]
    fn pick_selects_variant() {
        assert_eq!(Language::Ar.pick("hello", "أهلاً"), "أهلاً");
        assert_eq!(Language::En.pick("hello", "أهلاً"), "hello");
    }
}

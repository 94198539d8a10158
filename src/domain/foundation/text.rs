//! Text folding shared by every matcher.
//!
//! Titles, aliases and keywords are always compared in folded form, so case,
//! Arabic diacritics and Arabic letter variants never decide a match.

/// Arabic definite-article prefixes, longest first.
const ARTICLE_PREFIXES: [&str; 6] = ["وال", "بال", "فال", "كال", "لل", "ال"];

/// Folds text for matching.
///
/// Lowercases, drops Arabic diacritics and tatweel, unifies alef/yeh/teh
/// marbuta variants, maps Arabic-Indic digits to ASCII, turns punctuation
/// into spaces and collapses whitespace. `+` and `#` are kept (`c++`, `c#`),
/// `.` is kept between alphanumerics (`node.js`, `2.5`) and `/` becomes its
/// own token.
pub fn fold(text: &str) -> String {
    let mut mapped: Vec<char> = Vec::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}' => {}
            'أ' | 'إ' | 'آ' | 'ٱ' => mapped.push('ا'),
            'ى' | 'ئ' => mapped.push('ي'),
            'ة' => mapped.push('ه'),
            'ؤ' => mapped.push('و'),
            '٠'..='٩' => mapped.push(ascii_digit(c as u32 - 0x0660)),
            '۰'..='۹' => mapped.push(ascii_digit(c as u32 - 0x06F0)),
            '+' | '#' | '.' => mapped.push(c),
            '/' => mapped.extend([' ', '/', ' ']),
            c if c.is_alphanumeric() => mapped.extend(
                c.to_lowercase()
                    .filter(|l| l.is_alphanumeric() && !is_dropped_mark(*l)),
            ),
            _ => mapped.push(' '),
        }
    }

    // A dot survives only inside a token.
    let folded: String = mapped
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c != '.' {
                return c;
            }
            let prev = i.checked_sub(1).and_then(|p| mapped.get(p));
            match (prev, mapped.get(i + 1)) {
                (Some(p), Some(n)) if p.is_alphanumeric() && n.is_alphanumeric() => '.',
                _ => ' ',
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_dropped_mark(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}')
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

/// Splits folded text into tokens.
pub fn tokens(folded: &str) -> Vec<&str> {
    folded.split_whitespace().collect()
}

/// Strips a leading Arabic article ("ال", "بال", "وال", ...) from a token.
///
/// Returns `None` when the token has no article or the remainder would be
/// shorter than two letters.
pub fn strip_article(token: &str) -> Option<&str> {
    ARTICLE_PREFIXES.iter().find_map(|prefix| {
        token
            .strip_prefix(prefix)
            .filter(|rest| rest.chars().count() >= 2)
    })
}

/// Filler words that never carry topic meaning (folded forms).
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "with", "about", "is",
    "are", "be", "i", "im", "me", "my", "you", "your", "we", "it", "this", "that", "want",
    "need", "like", "would", "learn", "learning", "study", "course", "courses", "class",
    "please", "show", "give", "find", "suggest", "recommend", "some", "any", "more", "good",
    "best", "how", "what", "which", "can", "do", "get", "start",
    "انا", "عايز", "عاوز", "اريد", "حابب", "محتاج", "ابغي", "ابي", "اتعلم", "تعلم", "في",
    "من", "علي", "عن", "الي", "مع", "و", "او", "ايه", "اي", "كورس", "كورسات", "دوره",
    "دورات", "اقترح", "اقترحلي", "رشحلي", "ممكن", "لو", "سمحت", "عشان", "حاجه", "ازاي",
    "كيف", "ما", "هل", "بس", "كمان",
];

/// True for folded filler tokens.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Whole-token containment of `needle` in `haystack`, both already folded.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// True when folded `haystack` contains any of the (raw) phrases.
pub fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases
        .iter()
        .any(|phrase| contains_phrase(haystack, &fold(phrase)))
}

/// True for letters of the Arabic block.
pub fn is_arabic_letter(c: char) -> bool {
    ('\u{0621}'..='\u{064A}').contains(&c) || ('\u{0671}'..='\u{06D3}').contains(&c)
}

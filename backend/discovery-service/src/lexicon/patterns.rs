//! Character-level pattern checks shared by the filters, scorer and selection.
//!
//! The `regex` crate has no backreferences or lookaround, so the repeated-run
//! and mixed-script checks walk the characters directly.

use once_cell::sync::Lazy;
use regex::Regex;

static ONLY_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+$").expect("valid regex"));

static NUM_KO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+[가-힣]|[가-힣]+\d+").expect("valid regex"));

/// Runs of this many identical characters count as spam
pub const REPEAT_RUN: usize = 4;

pub fn is_hangul_syllable(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

/// Compatibility jamo: isolated consonants ㄱ-ㅎ and vowels ㅏ-ㅣ
pub fn is_compat_jamo(c: char) -> bool {
    ('ㄱ'..='ㅎ').contains(&c) || ('ㅏ'..='ㅣ').contains(&c)
}

pub fn contains_hangul(word: &str) -> bool {
    word.chars().any(is_hangul_syllable)
}

/// Two to six isolated jamo, e.g. `ㅇㅈ`, `ㄹㅇㅋㅋ`
pub fn is_initialism(word: &str) -> bool {
    let len = word.chars().count();
    (2..=6).contains(&len) && word.chars().all(is_compat_jamo)
}

/// Contains both a Latin letter and a Hangul syllable
pub fn is_mixed_script(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_alphabetic()) && contains_hangul(word)
}

/// Digits directly adjacent to Hangul, e.g. `3각`, `무야호2`
pub fn is_digit_adjacent(word: &str) -> bool {
    NUM_KO_RE.is_match(word)
}

/// Any character repeated [`REPEAT_RUN`] or more times in a row
pub fn has_repeated_run(word: &str) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in word.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= REPEAT_RUN {
            return true;
        }
    }
    false
}

pub fn is_only_punct(word: &str) -> bool {
    ONLY_PUNCT_RE.is_match(word)
}

/// Supplementary-plane code points (emoji and friends)
pub fn is_supplementary(c: char) -> bool {
    c as u32 >= 0x1_0000
}

pub fn contains_supplementary(word: &str) -> bool {
    word.chars().any(is_supplementary)
}

pub fn is_single_non_alpha(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if !c.is_alphabetic())
}

/// Word made only of the given filler characters, e.g. `ㅋㅋㅋ` or `ㅠㅠ`
pub fn is_filler_only(word: &str, fillers: &[char]) -> bool {
    !word.is_empty() && word.chars().all(|c| fillers.contains(&c))
}

/// Matches any of initialism, mixed script or digit-adjacent
pub fn is_interesting(word: &str) -> bool {
    is_initialism(word) || is_mixed_script(word) || is_digit_adjacent(word)
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

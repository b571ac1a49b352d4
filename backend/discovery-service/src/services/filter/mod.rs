//! Rule-based candidate narrowing.
//!
//! [`FilterChain`] is the cheap first pass over every token. [`StrictFilter`]
//! runs right before the dictionary stage and is the last chance to shed
//! volume before remote calls start.

mod containment;

pub use containment::filter_contained;

use crate::lexicon::patterns::{
    contains_supplementary, has_repeated_run, is_filler_only, is_only_punct, is_single_non_alpha,
};
use crate::lexicon::Lexicon;
use crate::models::FrequencyTable;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    NonEmpty,
    NotStopword,
    NotOnlyPunct,
    NoSupplementary,
    NoRepeatedRun,
    NotSingleNonAlpha,
    NotFillerOnly,
}

impl FilterRule {
    pub const BASIC: [FilterRule; 7] = [
        FilterRule::NonEmpty,
        FilterRule::NotStopword,
        FilterRule::NotOnlyPunct,
        FilterRule::NoSupplementary,
        FilterRule::NoRepeatedRun,
        FilterRule::NotSingleNonAlpha,
        FilterRule::NotFillerOnly,
    ];

    /// `word` is already trimmed
    fn passes(&self, word: &str, lexicon: &Lexicon) -> bool {
        match self {
            FilterRule::NonEmpty => !word.is_empty(),
            FilterRule::NotStopword => !lexicon.stopwords.contains(word),
            FilterRule::NotOnlyPunct => !is_only_punct(word),
            FilterRule::NoSupplementary => !contains_supplementary(word),
            FilterRule::NoRepeatedRun => !has_repeated_run(word),
            FilterRule::NotSingleNonAlpha => !is_single_non_alpha(word),
            FilterRule::NotFillerOnly => !is_filler_only(word, &lexicon.filler_chars),
        }
    }
}

/// Independent predicates applied left to right
pub struct FilterChain {
    rules: Vec<FilterRule>,
    lexicon: Arc<Lexicon>,
}

impl FilterChain {
    pub fn new(rules: Vec<FilterRule>, lexicon: Arc<Lexicon>) -> Self {
        Self { rules, lexicon }
    }

    pub fn basic(lexicon: Arc<Lexicon>) -> Self {
        Self::new(FilterRule::BASIC.to_vec(), lexicon)
    }

    /// First rule that rejects `word`, if any
    pub fn rejection(&self, word: &str) -> Option<FilterRule> {
        let word = word.trim();
        self.rules
            .iter()
            .copied()
            .find(|rule| !rule.passes(word, &self.lexicon))
    }

    pub fn keep(&self, word: &str) -> bool {
        self.rejection(word).is_none()
    }

    pub fn apply(&self, table: &FrequencyTable) -> FrequencyTable {
        let kept: FrequencyTable = table.iter().filter(|(w, _)| self.keep(w)).collect();
        debug!(before = table.len(), after = kept.len(), "Basic filter chain applied");
        kept
    }
}

/// Minimum-count pre-filter ahead of the dictionary stage
pub struct StrictFilter {
    min_count: u64,
    excludes_alphanumeric: bool,
    lexicon: Arc<Lexicon>,
}

impl StrictFilter {
    pub fn new(min_count: u64, excludes_alphanumeric: bool, lexicon: Arc<Lexicon>) -> Self {
        Self {
            min_count,
            excludes_alphanumeric,
            lexicon,
        }
    }

    /// Allow-listed words skip the pattern checks but still need `min_count`
    pub fn keep(&self, word: &str, count: u64) -> bool {
        if count < self.min_count {
            return false;
        }
        if self.lexicon.is_allowed(word) {
            return true;
        }
        if self.excludes_alphanumeric
            && word
                .chars()
                .any(|c| c.is_numeric() || c.is_ascii_alphabetic())
        {
            return false;
        }
        !(self.lexicon.common_words.contains(word)
            || self.lexicon.matches_non_slang(word)
            || self.lexicon.has_strict_suffix(word))
    }

    pub fn apply(&self, table: &FrequencyTable) -> FrequencyTable {
        let kept: FrequencyTable = table
            .iter()
            .filter(|(w, count)| self.keep(w, *count))
            .collect();
        debug!(
            before = table.len(),
            after = kept.len(),
            min_count = self.min_count,
            "Strict filter applied"
        );
        kept
    }
}

/// Remove block-listed words
pub fn apply_block_rules(table: &FrequencyTable, lexicon: &Lexicon) -> FrequencyTable {
    table
        .iter()
        .filter(|(w, _)| !lexicon.is_blocked(w))
        .collect()
}

//! Candidate scoring.
//!
//! `score = log(1 + freq) × Π boosts`. Every factor is a pure function of
//! the frequency tables, the dictionary verdicts, the per-source presence and
//! the prior-run snapshot, so the same inputs always rank the same way.

mod history;
mod presence;

pub use history::HistorySnapshot;
pub use presence::{collect_examples, SourcePresence};

use crate::lexicon::patterns::{
    contains_hangul, has_repeated_run, is_digit_adjacent, is_initialism, is_mixed_script,
};
use crate::lexicon::Lexicon;
use crate::services::tokenizer::NgramStats;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

const INITIALISM_BOOST: f64 = 1.5;
const MIXED_SCRIPT_BOOST: f64 = 1.35;
const DIGIT_ADJACENT_BOOST: f64 = 1.2;
const REPEATED_RUN_PENALTY: f64 = 0.6;
const COHESION_WEIGHT: f64 = 0.4;
const SOURCE_WEIGHT_SLOPE: f64 = 0.1;
const MULTI_SOURCE_SLOPE: f64 = 0.12;
const NEW_WORD_BOOST: f64 = 1.35;
const GROWTH_SLOPE: f64 = 0.2;
const GROWTH_CAP: f64 = 1.6;
const HANGUL_BONUS: f64 = 1.05;

/// Everything a score depends on
pub struct ScoringInputs<'a> {
    pub stats: &'a NgramStats,
    pub presence: &'a SourcePresence,
    pub standard: &'a HashMap<String, bool>,
    pub history: &'a HistorySnapshot,
    pub lexicon: &'a Lexicon,
}

/// Individual factors of one score, for logging and tests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub pattern: f64,
    pub cohesion: f64,
    pub length: f64,
    pub dictionary: f64,
    pub source_weight: f64,
    pub multi_source: f64,
    pub novelty: f64,
    pub script: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base
            * self.pattern
            * self.cohesion
            * self.length
            * self.dictionary
            * self.source_weight
            * self.multi_source
            * self.novelty
            * self.script
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWord {
    pub word: String,
    pub frequency: u64,
    pub score: f64,
}

pub fn pattern_factor(word: &str) -> f64 {
    let mut factor = 1.0;
    if is_initialism(word) {
        factor *= INITIALISM_BOOST;
    }
    if is_mixed_script(word) {
        factor *= MIXED_SCRIPT_BOOST;
    }
    if is_digit_adjacent(word) {
        factor *= DIGIT_ADJACENT_BOOST;
    }
    if has_repeated_run(word) {
        factor *= REPEATED_RUN_PENALTY;
    }
    factor
}

pub fn length_factor(len: usize) -> f64 {
    match len {
        1 => 0.6,
        2..=6 => 1.1,
        l if l > 12 => 0.9,
        _ => 1.0,
    }
}

/// Short standard words are suppressed harder
pub fn dictionary_factor(is_standard: bool, len: usize) -> f64 {
    match (is_standard, len) {
        (false, _) => 1.0,
        (true, l) if l <= 2 => 0.35,
        (true, _) => 0.7,
    }
}

pub fn source_weight_factor(weight_sum: f64) -> f64 {
    1.0 + SOURCE_WEIGHT_SLOPE * (weight_sum.max(1.0) - 1.0)
}

pub fn multi_source_factor(hits: usize) -> f64 {
    if hits >= 2 {
        1.0 + MULTI_SOURCE_SLOPE * (hits - 1) as f64
    } else {
        1.0
    }
}

/// Flat boost for words new since the last run, capped growth boost otherwise
pub fn novelty_factor(today: u64, prev: u64) -> f64 {
    if prev == 0 && today >= 2 {
        return NEW_WORD_BOOST;
    }
    let growth = (today as f64 - prev as f64) / (prev as f64 + 1.0);
    (1.0 + GROWTH_SLOPE * growth.max(0.0)).min(GROWTH_CAP)
}

pub struct Scorer<'a> {
    inputs: ScoringInputs<'a>,
}

impl<'a> Scorer<'a> {
    pub fn new(inputs: ScoringInputs<'a>) -> Self {
        Self { inputs }
    }

    fn is_standard(&self, word: &str) -> bool {
        self.inputs.standard.get(word).copied().unwrap_or(false)
    }

    pub fn breakdown(&self, word: &str) -> ScoreBreakdown {
        let stats = self.inputs.stats;
        let frequency = stats.frequency(word);
        let len = word.chars().count();

        let cohesion = if stats.is_bigram(word) {
            1.0 + COHESION_WEIGHT * stats.dice(word).min(1.0)
        } else {
            1.0
        };

        ScoreBreakdown {
            base: (frequency as f64).ln_1p(),
            pattern: pattern_factor(word),
            cohesion,
            length: length_factor(len),
            dictionary: dictionary_factor(self.is_standard(word), len),
            source_weight: source_weight_factor(
                self.inputs.presence.weight_sum(word, self.inputs.lexicon),
            ),
            multi_source: multi_source_factor(self.inputs.presence.source_hits(word)),
            novelty: novelty_factor(frequency, self.inputs.history.get(word)),
            script: if contains_hangul(word) { HANGUL_BONUS } else { 1.0 },
        }
    }

    pub fn score(&self, word: &str) -> f64 {
        self.breakdown(word).total()
    }

    /// Descending score, then descending frequency, then lexical order
    pub fn rank<'w, I>(&self, words: I) -> Vec<ScoredWord>
    where
        I: IntoIterator<Item = &'w str>,
    {
        let mut scored: Vec<ScoredWord> = words
            .into_iter()
            .map(|word| ScoredWord {
                word: word.to_string(),
                frequency: self.inputs.stats.frequency(word),
                score: self.score(word),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.word.cmp(&b.word))
        });
        scored
    }
}

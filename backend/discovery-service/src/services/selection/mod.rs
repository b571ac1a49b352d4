//! Two-tier selection: a strictly filtered head plus a softly filtered tail.

use crate::config::SelectionConfig;
use crate::lexicon::patterns::{
    has_repeated_run, is_filler_only, is_interesting, is_single_non_alpha,
};
use crate::services::scoring::ScoredWord;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Head rule: no standard words, single symbols, fillers or spam runs
pub fn strict_keep(word: &str, is_standard: bool, fillers: &[char]) -> bool {
    !(is_standard
        || is_single_non_alpha(word)
        || is_filler_only(word, fillers)
        || has_repeated_run(word))
}

/// Tail rule: no spam runs; standard words only when they look coined
pub fn soft_keep(word: &str, is_standard: bool) -> bool {
    if has_repeated_run(word) {
        return false;
    }
    !is_standard || is_interesting(word)
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub words: Vec<ScoredWord>,
    pub from_head: usize,
    pub from_tail: usize,
}

pub struct TwoTierSelector<'a> {
    config: &'a SelectionConfig,
    standard: &'a HashMap<String, bool>,
    fillers: &'a [char],
}

impl<'a> TwoTierSelector<'a> {
    pub fn new(
        config: &'a SelectionConfig,
        standard: &'a HashMap<String, bool>,
        fillers: &'a [char],
    ) -> Self {
        Self {
            config,
            standard,
            fillers,
        }
    }

    fn is_standard(&self, word: &str) -> bool {
        self.standard.get(word).copied().unwrap_or(false)
    }

    /// `ranked` must already be in score order
    pub fn select(&self, ranked: &[ScoredWord]) -> Selection {
        let head_end = self.config.top_strict_n.min(ranked.len());
        let tail_end = head_end
            .saturating_add(self.config.tail_pool_n)
            .min(ranked.len());

        let mut picked: Vec<&ScoredWord> = ranked[..head_end]
            .iter()
            .filter(|c| strict_keep(&c.word, self.is_standard(&c.word), self.fillers))
            .collect();
        let from_head = picked.len();

        let need = self.config.target_count.saturating_sub(from_head);
        if need > 0 {
            picked.extend(
                ranked[head_end..tail_end]
                    .iter()
                    .filter(|c| soft_keep(&c.word, self.is_standard(&c.word)))
                    .take(need),
            );
        }

        let mut seen = HashSet::new();
        let words: Vec<ScoredWord> = picked
            .into_iter()
            .filter(|c| seen.insert(c.word.as_str()))
            .cloned()
            .collect();
        let from_tail = words.len().saturating_sub(from_head);

        debug!(from_head, from_tail, total = words.len(), "Two-tier selection done");
        Selection {
            words,
            from_head,
            from_tail,
        }
    }
}

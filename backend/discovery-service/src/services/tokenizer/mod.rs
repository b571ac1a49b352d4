mod extractor;

pub use extractor::HangulNounExtractor;

use crate::models::{BigramParts, FrequencyTable};
use std::collections::HashMap;
use tracing::debug;

/// Bigram length bounds, in characters
pub const BIGRAM_MIN_LEN: usize = 2;
pub const BIGRAM_MAX_LEN: usize = 12;

/// Morphological noun extraction. Implementations must be pure.
pub trait NounExtractor: Send + Sync {
    fn extract_nouns(&self, text: &str) -> Vec<String>;
}

/// Unigram, bigram and combined counts for one corpus
#[derive(Debug, Clone, Default)]
pub struct NgramStats {
    pub unigrams: FrequencyTable,
    pub bigrams: FrequencyTable,
    /// unigrams + bigrams, summed per key
    pub combined: FrequencyTable,
    /// Constituents of every key in `bigrams`
    pub bigram_parts: HashMap<String, BigramParts>,
}

impl NgramStats {
    pub fn is_bigram(&self, word: &str) -> bool {
        self.bigrams.contains(word)
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.combined.get(word)
    }

    /// Dice cohesion of a bigram, 0.0 for anything else. Not clamped.
    pub fn dice(&self, word: &str) -> f64 {
        let pair = self.bigrams.get(word);
        if pair == 0 {
            return 0.0;
        }
        let Some(parts) = self.bigram_parts.get(word) else {
            return 0.0;
        };
        let left = self.unigrams.get(&parts.left) as f64;
        let right = self.unigrams.get(&parts.right) as f64;
        (2.0 * pair as f64) / (left + right + 1e-6)
    }
}

pub struct NgramBuilder<'a> {
    extractor: &'a dyn NounExtractor,
}

impl<'a> NgramBuilder<'a> {
    pub fn new(extractor: &'a dyn NounExtractor) -> Self {
        Self { extractor }
    }

    /// Count nouns and adjacent-noun bigrams. Bigrams never span two texts.
    pub fn build(&self, texts: &[String]) -> NgramStats {
        let mut stats = NgramStats::default();

        for text in texts {
            let nouns = self.extractor.extract_nouns(text);
            for noun in &nouns {
                stats.unigrams.increment(noun, 1);
            }

            for pair in nouns.windows(2) {
                let (left, right) = (&pair[0], &pair[1]);
                let bigram = format!("{}{}", left, right);
                let len = bigram.chars().count();
                if !(BIGRAM_MIN_LEN..=BIGRAM_MAX_LEN).contains(&len) {
                    continue;
                }
                stats.bigrams.increment(&bigram, 1);
                stats.bigram_parts.insert(
                    bigram,
                    BigramParts {
                        left: left.clone(),
                        right: right.clone(),
                    },
                );
            }
        }

        stats.combined = stats.unigrams.clone();
        stats.combined.merge(&stats.bigrams);

        debug!(
            texts = texts.len(),
            unigrams = stats.unigrams.len(),
            bigrams = stats.bigrams.len(),
            "N-grams built"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on whitespace, every piece is a noun
    struct WhitespaceExtractor;

    impl NounExtractor for WhitespaceExtractor {
        fn extract_nouns(&self, text: &str) -> Vec<String> {
            text.split_whitespace().map(str::to_string).collect()
        }
    }

    fn build(texts: &[&str]) -> NgramStats {
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        NgramBuilder::new(&WhitespaceExtractor).build(&texts)
    }

    #[test]
    fn test_bigrams_from_adjacent_nouns() {
        let stats = build(&["퇴사 각", "퇴사 각 잡힘"]);

        assert_eq!(stats.unigrams.get("퇴사"), 2);
        assert_eq!(stats.bigrams.get("퇴사각"), 2);
        assert_eq!(stats.bigrams.get("각잡힘"), 1);
        assert_eq!(stats.combined.get("퇴사각"), 2);
        assert_eq!(stats.combined.get("퇴사"), 2);
        assert_eq!(
            stats.bigram_parts.get("퇴사각"),
            Some(&BigramParts {
                left: "퇴사".into(),
                right: "각".into()
            })
        );
    }

    #[test]
    fn test_bigrams_never_span_texts() {
        let stats = build(&["갓생", "루틴"]);
        assert!(stats.bigrams.is_empty());
        assert!(!stats.combined.contains("갓생루틴"));
    }

    #[test]
    fn test_bigram_length_bounds() {
        let stats = build(&["일이삼사오육칠 팔구십일이삼", "가 나"]);

        for (bigram, _) in stats.bigrams.iter() {
            let len = bigram.chars().count();
            assert!((BIGRAM_MIN_LEN..=BIGRAM_MAX_LEN).contains(&len), "{bigram}");
        }
        assert!(stats.bigrams.contains("가나"));
        assert_eq!(stats.bigrams.len(), 1);
    }

    #[test]
    fn test_every_bigram_has_parts() {
        let stats = build(&["존맛 탱 인정", "갑분 싸"]);
        for (bigram, _) in stats.bigrams.iter() {
            assert!(stats.bigram_parts.contains_key(bigram));
        }
    }

    #[test]
    fn test_dice_cohesion() {
        let stats = build(&["퇴사 각", "퇴사 각", "퇴사 금지"]);
        // pair 2, left 3, right 2
        let dice = stats.dice("퇴사각");
        assert!((dice - 0.8).abs() < 1e-5);
        assert_eq!(stats.dice("퇴사"), 0.0);
    }
}

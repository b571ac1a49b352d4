use crate::lexicon::Lexicon;
use crate::models::SourceIndex;
use crate::services::tokenizer::NounExtractor;
use std::collections::{BTreeMap, HashSet};

struct SourceTexts {
    name: String,
    texts: Vec<String>,
    /// Nouns of each text concatenated, one entry per text
    joined_nouns: Vec<String>,
}

/// Per-source view of the corpus for source weighting and corroboration
pub struct SourcePresence {
    sources: Vec<SourceTexts>,
}

impl SourcePresence {
    pub fn build(index: &SourceIndex, extractor: &dyn NounExtractor) -> Self {
        let sources = index
            .sources()
            .map(|(name, texts)| SourceTexts {
                name: name.to_string(),
                texts: texts.to_vec(),
                joined_nouns: texts
                    .iter()
                    .map(|t| extractor.extract_nouns(t).concat())
                    .collect(),
            })
            .collect();
        Self { sources }
    }

    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Sum of weights of sources whose raw text contains `word`, floored at 1.0
    pub fn weight_sum(&self, word: &str, lexicon: &Lexicon) -> f64 {
        let sum: f64 = self
            .sources
            .iter()
            .filter(|s| s.texts.iter().any(|t| t.contains(word)))
            .map(|s| lexicon.source_weight(&s.name))
            .sum();
        sum.max(1.0)
    }

    /// Number of distinct sources whose extracted nouns contain `word`
    pub fn source_hits(&self, word: &str) -> usize {
        self.sources
            .iter()
            .filter(|s| s.joined_nouns.iter().any(|n| n.contains(word)))
            .count()
    }
}

/// Up to `max_examples` texts containing each word, in corpus order, each cut to `max_chars`
pub fn collect_examples<'a, I>(
    words: I,
    corpus: &[String],
    max_examples: usize,
    max_chars: usize,
) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut examples = BTreeMap::new();
    for word in words.into_iter().collect::<HashSet<_>>() {
        let found: Vec<String> = corpus
            .iter()
            .filter(|t| t.contains(word))
            .take(max_examples)
            .map(|t| t.chars().take(max_chars).collect())
            .collect();
        examples.insert(word.to_string(), found);
    }
    examples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconDocument;
    use std::collections::HashMap;

    struct WhitespaceExtractor;

    impl NounExtractor for WhitespaceExtractor {
        fn extract_nouns(&self, text: &str) -> Vec<String> {
            text.split_whitespace().map(str::to_string).collect()
        }
    }

    fn index() -> SourceIndex {
        let mut index = SourceIndex::new();
        index.insert("네이트판-일간랭킹", vec!["갓생 루틴 공유".to_string()]);
        index.insert("RSS", vec!["갓생 사는 법".to_string(), "퇴사 각".to_string()]);
        index.insert("뽐뿌-유머", vec!["오늘 점심".to_string()]);
        index
    }

    #[test]
    fn test_weight_sum_and_hits() {
        let document = LexiconDocument {
            source_weights: HashMap::from([("네이트판-일간랭킹".to_string(), 1.3)]),
            ..Default::default()
        };
        let lexicon = Lexicon::from_document(document).unwrap();
        let presence = SourcePresence::build(&index(), &WhitespaceExtractor);

        assert!((presence.weight_sum("갓생", &lexicon) - 2.3).abs() < 1e-9);
        assert_eq!(presence.weight_sum("점심", &lexicon), 1.0);
        assert_eq!(presence.weight_sum("없음", &lexicon), 1.0);
        assert_eq!(presence.source_hits("갓생"), 2);
        // joined nouns let bigrams match across the space
        assert_eq!(presence.source_hits("퇴사각"), 1);
        assert_eq!(presence.source_hits("없음"), 0);
    }

    #[test]
    fn test_examples_capped_and_trimmed() {
        let corpus: Vec<String> = vec![
            "갓생 첫째".into(),
            "무관한 글".into(),
            "갓생 둘째".into(),
            "갓생 셋째".into(),
            "갓생 넷째".into(),
        ];
        let examples = collect_examples(["갓생", "없음"], &corpus, 3, 4);

        assert_eq!(examples["갓생"], vec!["갓생 첫", "갓생 둘", "갓생 셋"]);
        assert!(examples["없음"].is_empty());
    }
}

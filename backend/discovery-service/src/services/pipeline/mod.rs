// ============================================
// Discovery pipeline
// ============================================
//
// texts → n-grams → pre-filter → strict pass → block rules → containment
//       → dictionary → classifier → profanity → score → two-tier selection
//       → adjudication → min-keep floor → meanings → RunReport
//
// Everything after collection runs sequentially; the only fan-out is the
// dictionary batch lookup.

use crate::config::Config;
use crate::error::{DiscoveryError, Result};
use crate::lexicon::Lexicon;
use crate::models::{Candidate, FinalWord, RunReport, SourceIndex, StageCounts};
use crate::services::adjudicator::{apply_min_keep, Adjudicator, PassthroughAdjudicator};
use crate::services::classifier::ClassifierFilter;
use crate::services::collector::{collect_sources, TextSource};
use crate::services::dictionary::DictionaryOracle;
use crate::services::filter::{apply_block_rules, filter_contained, FilterChain, StrictFilter};
use crate::services::meaning::MeaningResolver;
use crate::services::moderation::ProfanityFilter;
use crate::services::scoring::{
    collect_examples, HistorySnapshot, Scorer, ScoringInputs, SourcePresence,
};
use crate::services::selection::TwoTierSelector;
use crate::services::tokenizer::{HangulNounExtractor, NgramBuilder, NounExtractor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Example texts are cut to this many characters
const EXAMPLE_MAX_CHARS: usize = 200;

pub struct DiscoveryPipeline {
    config: Config,
    lexicon: Arc<Lexicon>,
    extractor: Arc<dyn NounExtractor>,
    oracle: Arc<DictionaryOracle>,
    classifier: ClassifierFilter,
    profanity: ProfanityFilter,
    adjudicator: Arc<dyn Adjudicator>,
    meanings: MeaningResolver,
}

impl DiscoveryPipeline {
    /// Pipeline with the Hangul extractor, no classifier, a passthrough adjudicator
    /// and no meaning lookup
    pub fn new(config: Config, lexicon: Arc<Lexicon>, oracle: Arc<DictionaryOracle>) -> Self {
        Self {
            extractor: Arc::new(HangulNounExtractor::new(lexicon.clone())),
            profanity: ProfanityFilter::from_lexicon(&lexicon),
            classifier: ClassifierFilter::disabled(),
            adjudicator: Arc::new(PassthroughAdjudicator),
            meanings: MeaningResolver::disabled(),
            config,
            lexicon,
            oracle,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn NounExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierFilter) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_profanity(mut self, profanity: ProfanityFilter) -> Self {
        self.profanity = profanity;
        self
    }

    pub fn with_adjudicator(mut self, adjudicator: Arc<dyn Adjudicator>) -> Self {
        self.adjudicator = adjudicator;
        self
    }

    pub fn with_meanings(mut self, meanings: MeaningResolver) -> Self {
        self.meanings = meanings;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Collect every source, then run one pass over what came back
    pub async fn run_from_sources(&self, sources: &[Arc<dyn TextSource>]) -> Result<RunReport> {
        let index = collect_sources(sources, self.config.collector.concurrency).await;
        self.run(&index).await
    }

    pub async fn run(&self, index: &SourceIndex) -> Result<RunReport> {
        if index.is_empty() {
            warn!(
                sources = index.source_count(),
                "No text collected, aborting run"
            );
            return Err(DiscoveryError::NoTextCollected);
        }

        let mut counts = StageCounts::default();
        let corpus = index.corpus();
        counts.texts = corpus.len();

        // Tokenize
        let stats = NgramBuilder::new(self.extractor.as_ref()).build(&corpus);
        counts.tokens = stats.combined.len();
        info!(
            texts = counts.texts,
            unigrams = stats.unigrams.len(),
            bigrams = stats.bigrams.len(),
            "Corpus tokenized"
        );

        // Narrow
        let filter = &self.config.filter;
        let pre = FilterChain::basic(self.lexicon.clone()).apply(&stats.combined);
        counts.pre_filtered = pre.len();

        let strict = StrictFilter::new(
            filter.min_count,
            filter.strict_excludes_alphanumeric,
            self.lexicon.clone(),
        )
        .apply(&pre);
        counts.strict_filtered = strict.len();

        let unblocked = apply_block_rules(&strict, &self.lexicon);
        counts.after_block_rules = unblocked.len();

        let narrowed = filter_contained(&unblocked);
        counts.after_containment = narrowed.len();
        info!(
            pre_filtered = counts.pre_filtered,
            strict = counts.strict_filtered,
            unblocked = counts.after_block_rules,
            contained = counts.after_containment,
            "Candidates narrowed"
        );

        // Dictionary
        let words: Vec<String> = narrowed.keys().cloned().collect();
        let standard = self.oracle.lookup_batch(&words).await;

        // Classifier
        let examples = collect_examples(
            words.iter().map(String::as_str),
            &corpus,
            filter.max_examples,
            EXAMPLE_MAX_CHARS,
        );
        let contexts: HashMap<String, Vec<String>> = examples
            .iter()
            .map(|(word, texts)| (word.clone(), texts.clone()))
            .collect();
        let classifier_input: Vec<(String, u64)> = narrowed
            .iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect();
        let classified = self.classifier.apply(&classifier_input, &contexts).await;
        counts.after_classifier = classified.kept.len();

        // Profanity
        let clean = self
            .profanity
            .retain(classified.kept.keys().map(String::as_str));
        counts.after_profanity = clean.len();
        debug!(
            classifier_skipped = classified.skipped,
            after_classifier = counts.after_classifier,
            after_profanity = counts.after_profanity,
            "Moderation done"
        );

        // Score
        let presence = SourcePresence::build(index, self.extractor.as_ref());
        let history = HistorySnapshot::load(&self.config.paths.history);
        let scorer = Scorer::new(ScoringInputs {
            stats: &stats,
            presence: &presence,
            standard: &standard,
            history: &history,
            lexicon: &self.lexicon,
        });
        let ranked = scorer.rank(clean.iter().copied());

        // Select
        let selection = TwoTierSelector::new(
            &self.config.selection,
            &standard,
            &self.lexicon.filler_chars,
        )
        .select(&ranked);
        counts.selected = selection.words.len();
        let pre_adjudication: Vec<String> =
            selection.words.iter().map(|w| w.word.clone()).collect();

        // Adjudicate
        let adjudication = self.adjudicator.adjudicate(&pre_adjudication).await;
        let final_words = apply_min_keep(
            adjudication.words,
            &pre_adjudication,
            self.config.selection.min_keep,
        );
        counts.final_count = final_words.len();

        // Meanings
        let resolution = self.meanings.resolve(&final_words, &examples).await;
        counts.with_meaning = final_words
            .iter()
            .filter(|w| resolution.meanings.contains_key(w.as_str()))
            .count();

        if let Err(e) = HistorySnapshot::save(&self.config.paths.history, &stats.combined) {
            warn!(
                path = %self.config.paths.history.display(),
                error = %e,
                "Failed to save prior-run snapshot"
            );
        }

        let candidates = ranked
            .iter()
            .map(|scored| Candidate {
                word: scored.word.clone(),
                frequency: scored.frequency,
                score: scored.score,
                examples: resolution
                    .examples
                    .get(&scored.word)
                    .or_else(|| examples.get(&scored.word))
                    .cloned()
                    .unwrap_or_default(),
                is_standard: standard.get(&scored.word).copied().unwrap_or(false),
                slang_probability: classified.kept.get(&scored.word).copied().flatten(),
                meaning: resolution.meaning(&scored.word),
            })
            .collect();
        let final_list = final_words
            .into_iter()
            .map(|word| FinalWord {
                frequency: stats.frequency(&word),
                meaning: resolution.meaning(&word),
                word,
            })
            .collect();

        info!(
            selected = counts.selected,
            final_count = counts.final_count,
            with_meaning = counts.with_meaning,
            adjudication = adjudication.state.as_str(),
            "Discovery run finished"
        );

        Ok(RunReport {
            final_list,
            candidates,
            stage_counts: counts,
            adjudication: adjudication.state,
        })
    }
}

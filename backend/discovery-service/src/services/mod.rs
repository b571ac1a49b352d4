pub mod adjudicator;
pub mod classifier;
pub mod collector;
pub mod dictionary;
pub mod filter;
pub mod meaning;
pub mod moderation;
pub mod pipeline;
pub mod scoring;
pub mod selection;
pub mod tokenizer;

pub use adjudicator::{Adjudicator, LlmAdjudicator, PassthroughAdjudicator};
pub use classifier::{ClassifierFilter, HttpSlangClassifier, SlangClassifier};
pub use collector::{collect_sources, FileTextSource, TextSource};
pub use dictionary::{DictionaryCache, DictionaryOracle, NaverDictionaryClient};
pub use meaning::{
    LlmMeaningExtractor, ManualMeanings, MeaningCache, MeaningExtractor, MeaningResolver,
};
pub use moderation::ProfanityFilter;
pub use pipeline::DiscoveryPipeline;
pub use scoring::{HistorySnapshot, Scorer};
pub use selection::TwoTierSelector;
pub use tokenizer::{HangulNounExtractor, NgramBuilder, NounExtractor};

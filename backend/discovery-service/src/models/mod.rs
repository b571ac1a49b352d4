use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};

/// Token → occurrence count. Keys are unique and counts only grow during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable(BTreeMap<String, u64>);

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero increments are ignored so every key stays backed by an occurrence
    pub fn increment(&mut self, token: &str, by: u64) {
        if by == 0 || token.is_empty() {
            return;
        }
        *self.0.entry(token.to_string()).or_insert(0) += by;
    }

    pub fn get(&self, token: &str) -> u64 {
        self.0.get(token).copied().unwrap_or(0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    /// Sum `other` into `self`, key by key
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (token, count) in other.iter() {
            self.increment(token, count);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, u64> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for (token, count) in iter {
            table.increment(&token.into(), count);
        }
        table
    }
}

/// The two adjacent nouns a bigram was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigramParts {
    pub left: String,
    pub right: String,
}

/// Source name → texts contributed by that source. Built fresh per run.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    sources: BTreeMap<String, Vec<String>>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, texts: Vec<String>) {
        self.sources.entry(source.into()).or_default().extend(texts);
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn total_texts(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    /// All texts across sources, de-duplicated, in index order
    pub fn corpus(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sources
            .values()
            .flatten()
            .filter(|text| seen.insert(text.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total_texts() == 0
    }
}

/// A scored word handed to selection and to downstream collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub word: String,
    pub frequency: u64,
    pub score: f64,
    pub examples: Vec<String>,
    pub is_standard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slang_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<Meaning>,
}

/// One accepted word of the final list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalWord {
    pub word: String,
    pub frequency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<Meaning>,
}

/// Where a word's meaning came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeaningSource {
    /// Hand-written override
    Manual,
    /// Generated in an earlier run
    Cached,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    pub text: String,
    pub source: MeaningSource,
}

/// How the external adjudication stage resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjudicationState {
    /// Capability unavailable or nothing to adjudicate
    Passthrough,
    ParsedOk,
    ParseFailed,
    TransportFailed,
}

impl AdjudicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjudicationState::Passthrough => "passthrough",
            AdjudicationState::ParsedOk => "parsed_ok",
            AdjudicationState::ParseFailed => "parse_failed",
            AdjudicationState::TransportFailed => "transport_failed",
        }
    }
}

/// Candidate count after each pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub texts: usize,
    pub tokens: usize,
    pub pre_filtered: usize,
    pub strict_filtered: usize,
    pub after_containment: usize,
    pub after_block_rules: usize,
    pub after_classifier: usize,
    pub after_profanity: usize,
    pub selected: usize,
    pub final_count: usize,
    #[serde(default)]
    pub with_meaning: usize,
}

/// Everything a run hands to persistence and notification collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub final_list: Vec<FinalWord>,
    pub candidates: Vec<Candidate>,
    pub stage_counts: StageCounts,
    pub adjudication: AdjudicationState,
}

impl RunReport {
    pub fn words(&self) -> Vec<&str> {
        self.final_list.iter().map(|w| w.word.as_str()).collect()
    }
}

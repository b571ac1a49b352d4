//! Lexical configuration for the filters and scorer.
//!
//! Stopwords, particle suffixes, non-slang patterns, profanity terms and
//! source weights are data, loaded once at startup. The algorithms only see
//! the compiled [`Lexicon`].

pub mod patterns;

use crate::error::{DiscoveryError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_LEXICON: &str = include_str!("../../data/lexicon.json");

/// On-disk shape of the lexicon document. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LexiconDocument {
    pub stopwords: Vec<String>,
    pub common_words: Vec<String>,
    pub particles: Vec<String>,
    pub strict_suffixes: Vec<String>,
    pub non_slang_patterns: Vec<String>,
    pub filler_chars: Vec<String>,
    pub profanity: Vec<String>,
    pub source_weights: HashMap<String, f64>,
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Lexicon {
    pub stopwords: HashSet<String>,
    pub common_words: HashSet<String>,
    /// Longest first, so stripping prefers `에서` over `서`
    pub particles: Vec<String>,
    pub strict_suffixes: Vec<String>,
    pub non_slang_patterns: Vec<Regex>,
    pub filler_chars: Vec<char>,
    pub profanity: Vec<String>,
    pub source_weights: HashMap<String, f64>,
    pub allow: HashSet<String>,
    pub block: HashSet<String>,
}

impl Lexicon {
    /// Load from `path`, falling back to the built-in lexicon when the file is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Lexicon file not found, using built-in lexicon");
            return Self::builtin();
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DiscoveryError::Config(format!(
                "Failed to read lexicon from {}: {}",
                path.display(),
                e
            ))
        })?;
        let lexicon = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            stopwords = lexicon.stopwords.len(),
            patterns = lexicon.non_slang_patterns.len(),
            allow = lexicon.allow.len(),
            block = lexicon.block.len(),
            "Lexicon loaded"
        );
        Ok(lexicon)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LEXICON)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: LexiconDocument = serde_json::from_str(json)
            .map_err(|e| DiscoveryError::Config(format!("Invalid lexicon document: {}", e)))?;
        Self::from_document(document)
    }

    pub fn from_document(document: LexiconDocument) -> Result<Self> {
        let non_slang_patterns = document
            .non_slang_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    DiscoveryError::Config(format!("Invalid non-slang pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut particles: Vec<String> = clean_list(document.particles)
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        particles.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        let filler_chars = document
            .filler_chars
            .iter()
            .flat_map(|s| s.chars())
            .collect();

        let profanity = document
            .profanity
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.to_lowercase())
            .collect();

        Ok(Self {
            stopwords: clean_list(document.stopwords).into_iter().collect(),
            common_words: clean_list(document.common_words).into_iter().collect(),
            particles,
            strict_suffixes: clean_list(document.strict_suffixes),
            non_slang_patterns,
            filler_chars,
            profanity,
            source_weights: document.source_weights,
            allow: clean_list(document.allow).into_iter().collect(),
            block: clean_list(document.block).into_iter().collect(),
        })
    }

    /// Weight of a named source, 1.0 when not configured
    pub fn source_weight(&self, source: &str) -> f64 {
        self.source_weights.get(source).copied().unwrap_or(1.0)
    }

    /// Strip one trailing particle, longest match first
    pub fn strip_particle<'a>(&self, word: &'a str) -> &'a str {
        for particle in &self.particles {
            if let Some(stem) = word.strip_suffix(particle.as_str()) {
                return stem;
            }
        }
        word
    }

    pub fn is_allowed(&self, word: &str) -> bool {
        self.allow.contains(word)
    }

    pub fn is_blocked(&self, word: &str) -> bool {
        self.block.contains(word)
    }

    pub fn matches_non_slang(&self, word: &str) -> bool {
        self.non_slang_patterns.iter().any(|p| p.is_match(word))
    }

    pub fn has_strict_suffix(&self, word: &str) -> bool {
        self.strict_suffixes.iter().any(|s| word.ends_with(s.as_str()))
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

use crate::error::{DiscoveryError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Hand-written meaning and examples for one word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualMeaning {
    pub meaning: Option<String>,
    pub examples: Vec<String>,
}

/// A value is either `{"meaning": ..., "examples": [...]}` or a bare meaning string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManualEntryDocument {
    Full {
        #[serde(default)]
        meaning: Option<String>,
        #[serde(default)]
        examples: Vec<String>,
    },
    Plain(String),
}

impl From<ManualEntryDocument> for ManualMeaning {
    fn from(doc: ManualEntryDocument) -> Self {
        let (meaning, examples) = match doc {
            ManualEntryDocument::Full { meaning, examples } => (meaning, examples),
            ManualEntryDocument::Plain(meaning) => (Some(meaning), Vec::new()),
        };
        Self {
            meaning: meaning
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            examples: examples
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

/// Operator-maintained overrides, keyed by word
#[derive(Debug, Clone, Default)]
pub struct ManualMeanings {
    entries: HashMap<String, ManualMeaning>,
}

impl ManualMeanings {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file means no overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No manual meanings file");
            return Ok(Self::empty());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DiscoveryError::Config(format!(
                "Failed to read manual meanings from {}: {}",
                path.display(),
                e
            ))
        })?;
        let manual = Self::from_json(&content)?;
        info!(path = %path.display(), entries = manual.len(), "Manual meanings loaded");
        Ok(manual)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let json = json.trim_start_matches('\u{feff}').trim();
        if json.is_empty() {
            return Ok(Self::empty());
        }

        let document: HashMap<String, ManualEntryDocument> = serde_json::from_str(json)
            .map_err(|e| DiscoveryError::Config(format!("Invalid manual meanings: {}", e)))?;

        let entries = document
            .into_iter()
            .map(|(word, doc)| (word.trim().to_string(), ManualMeaning::from(doc)))
            .filter(|(word, m)| !word.is_empty() && (m.meaning.is_some() || !m.examples.is_empty()))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, word: &str) -> Option<&ManualMeaning> {
        self.entries.get(word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generated meanings kept across runs as one JSON object
#[derive(Debug, Clone, Default)]
pub struct MeaningCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl MeaningCache {
    /// Cache that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Missing or corrupt files start an empty cache at `path`
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt meaning cache, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No meaning cache yet");
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    pub fn insert(&mut self, word: impl Into<String>, meaning: impl Into<String>) {
        self.entries.insert(word.into(), meaning.into());
    }

    /// Rewrite the whole file. In-memory caches have nothing to write.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

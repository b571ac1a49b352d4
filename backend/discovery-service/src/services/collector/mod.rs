//! Text source collection.
//!
//! Sources are fetched concurrently on a bounded pool and joined into a
//! [`SourceIndex`] before tokenization starts. A failing source contributes
//! nothing; it never aborts the run.

use crate::error::{DiscoveryError, Result};
use crate::lexicon::patterns::{
    collapse_whitespace, has_repeated_run, is_filler_only, is_only_punct, is_supplementary,
};
use crate::models::SourceIndex;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use resilience::{presets, with_timeout_result, TimeoutError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Laughter and crying fillers that make a whole title noise
const NOISE_FILLERS: [char; 4] = ['ㅋ', 'ㅎ', 'ㅠ', 'ㅜ'];

#[async_trait]
pub trait TextSource: Send + Sync {
    fn name(&self) -> &str;

    /// Raw titles in the order the source lists them
    async fn fetch(&self) -> Result<Vec<String>>;
}

/// One UTF-8 file, one text per line. The source is named after the file stem.
pub struct FileTextSource {
    name: String,
    path: PathBuf,
}

impl FileTextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// One source per `*.txt` file in `dir`, sorted by file name
    pub async fn discover(dir: impl AsRef<Path>) -> Result<Vec<Arc<dyn TextSource>>> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|p| Arc::new(FileTextSource::new(p)) as Arc<dyn TextSource>)
            .collect())
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DiscoveryError::Source {
                source_name: self.name.clone(),
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

/// Collapse whitespace and drop supplementary-plane characters
pub fn normalize_title(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !is_supplementary(*c)).collect();
    collapse_whitespace(&stripped)
}

pub fn is_noisy_title(text: &str) -> bool {
    text.is_empty()
        || is_only_punct(text)
        || is_filler_only(text, &NOISE_FILLERS)
        || has_repeated_run(text)
}

/// Normalize, drop noise and de-duplicate while keeping first occurrences
pub fn clean_titles(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|t| normalize_title(t))
        .filter(|t| !is_noisy_title(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Fetch every source with at most `concurrency` in flight
pub async fn collect_sources(sources: &[Arc<dyn TextSource>], concurrency: usize) -> SourceIndex {
    let timeout = presets::source_fetch_config().timeout.duration;

    let results: Vec<(String, Result<Vec<String>>)> = stream::iter(sources.iter().cloned())
        .map(|source| async move {
            let name = source.name().to_string();
            let fetched = match with_timeout_result(timeout, source.fetch()).await {
                Ok(texts) => Ok(texts),
                Err(TimeoutError::Elapsed(d)) => Err(DiscoveryError::Source {
                    source_name: name.clone(),
                    reason: format!("timed out after {:?}", d),
                }),
                Err(TimeoutError::Failed(e)) => Err(e),
            };
            (name, fetched)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut index = SourceIndex::new();
    for (name, result) in results {
        match result {
            Ok(raw) => {
                let raw_count = raw.len();
                let texts = clean_titles(raw);
                debug!(source = %name, raw = raw_count, kept = texts.len(), "Source collected");
                index.insert(name, texts);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source failed, continuing without it");
            }
        }
    }

    info!(
        sources = index.source_count(),
        texts = index.total_texts(),
        "Collection finished"
    );
    index
}

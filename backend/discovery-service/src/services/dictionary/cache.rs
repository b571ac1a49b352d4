use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// One line of the append-only cache log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryCacheEntry {
    pub word: String,
    /// Standard dictionary word
    pub ok: bool,
    /// Unix seconds
    pub expires_at: i64,
}

impl DictionaryCacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.expires_at
    }
}

/// In-memory index over the JSONL verdict log.
///
/// [`DictionaryCache::insert`] only touches the index; the matching line is
/// written through a [`CacheLog`] so no file I/O happens under the index
/// lock. The last line for a word wins on reload. Expired entries stay in the
/// index and are simply ignored by [`DictionaryCache::get`].
#[derive(Debug, Default)]
pub struct DictionaryCache {
    path: Option<PathBuf>,
    index: HashMap<String, DictionaryCacheEntry>,
}

impl DictionaryCache {
    /// Cache that never touches disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the log at `path`. A missing file is an empty cache; corrupt lines are skipped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = HashMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut corrupt = 0usize;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<DictionaryCacheEntry>(line) {
                    Ok(entry) => {
                        index.insert(entry.word.clone(), entry);
                    }
                    Err(_) => corrupt += 1,
                }
            }
            if corrupt > 0 {
                warn!(path = %path.display(), corrupt, "Skipped corrupt dictionary cache lines");
            }
            info!(path = %path.display(), entries = index.len(), "Dictionary cache loaded");
        } else if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path: Some(path),
            index,
        })
    }

    /// Appender for this cache's log, if it has one
    pub fn log(&self) -> Option<CacheLog> {
        self.path.clone().map(CacheLog::new)
    }

    /// Verdict for `word` if an unexpired entry exists
    pub fn get(&self, word: &str, now: DateTime<Utc>) -> Option<bool> {
        self.index
            .get(word)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.ok)
    }

    pub fn entry(&self, word: &str) -> Option<&DictionaryCacheEntry> {
        self.index.get(word)
    }

    /// Index a verdict valid for `ttl` from `now` and return the line to persist
    pub fn insert(
        &mut self,
        word: &str,
        ok: bool,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> DictionaryCacheEntry {
        let entry = DictionaryCacheEntry {
            word: word.to_string(),
            ok,
            expires_at: now.timestamp() + ttl.as_secs() as i64,
        };
        self.index.insert(entry.word.clone(), entry.clone());
        entry
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Async appender for the cache log. Appends are serialized so concurrent
/// lookups never interleave partial lines.
#[derive(Debug)]
pub struct CacheLog {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl CacheLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn append(&self, entry: &DictionaryCacheEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

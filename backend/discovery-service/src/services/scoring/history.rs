use crate::error::Result;
use crate::models::FrequencyTable;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Word counts of the previous run, used for novelty scoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    counts: BTreeMap<String, u64>,
}

impl HistorySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Absent or unreadable snapshots mean "no history"
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No prior-run snapshot");
                return Self::empty();
            }
        };

        match serde_json::from_str::<BTreeMap<String, u64>>(&content) {
            Ok(counts) => Self { counts },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt prior-run snapshot, ignoring");
                Self::empty()
            }
        }
    }

    /// Write `table` as the snapshot for the next run
    pub fn save(path: impl AsRef<Path>, table: &FrequencyTable) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(table)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

use crate::error::{DiscoveryError, Result};
use crate::lexicon::Lexicon;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Rejects candidates containing a profanity term, unless allow-listed
pub struct ProfanityFilter {
    terms: Vec<String>,
    allow: HashSet<String>,
}

impl ProfanityFilter {
    pub fn new(terms: Vec<String>, allow: HashSet<String>) -> Self {
        Self { terms, allow }
    }

    pub fn from_lexicon(lexicon: &Lexicon) -> Self {
        Self::new(lexicon.profanity.clone(), lexicon.allow.clone())
    }

    /// Load terms from a word file: one term per line, `#` comments and blank lines ignored
    pub fn from_file(path: impl AsRef<Path>, allow: HashSet<String>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            DiscoveryError::Config(format!(
                "Failed to load profanity terms from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let terms = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|line| line.trim().to_lowercase())
            .collect();

        Ok(Self::new(terms, allow))
    }

    pub fn is_profane(&self, word: &str) -> bool {
        if self.allow.contains(word) {
            return false;
        }
        let normalized = word.to_lowercase();
        self.terms.iter().any(|term| normalized.contains(term.as_str()))
    }

    /// Keep the words that pass
    pub fn retain<'a, I>(&self, words: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        words.into_iter().filter(|w| !self.is_profane(w)).collect()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substring_match_and_allow_list() {
        let filter = ProfanityFilter::new(
            vec!["시발".to_string(), "badword".to_string()],
            HashSet::from(["시발점".to_string()]),
        );

        assert!(filter.is_profane("개시발"));
        assert!(filter.is_profane("BadWord짤"));
        assert!(!filter.is_profane("시발점"));
        assert!(!filter.is_profane("갓생"));
        assert_eq!(filter.retain(["갓생", "개시발", "시발점"]), vec!["갓생", "시발점"]);
    }

    #[test]
    fn test_word_file_loading() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# 비속어 목록").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  병신  ").unwrap();
        writeln!(file, "ㅅㅂ").unwrap();

        let filter = ProfanityFilter::from_file(file.path(), HashSet::new()).unwrap();
        assert_eq!(filter.len(), 2);
        assert!(filter.is_profane("병신같네"));
    }

    #[test]
    fn test_missing_word_file_is_config_error() {
        let result = ProfanityFilter::from_file("/nonexistent/words.txt", HashSet::new());
        assert!(matches!(result, Err(DiscoveryError::Config(_))));
    }
}

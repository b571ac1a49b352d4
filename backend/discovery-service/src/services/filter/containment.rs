use crate::models::FrequencyTable;
use std::collections::HashSet;

/// Drop every candidate that contains a shorter surviving candidate.
///
/// Candidates are walked shortest first (ties in lexical order); each word
/// that is still alive marks every longer word containing it as removed.
pub fn filter_contained(table: &FrequencyTable) -> FrequencyTable {
    let mut words: Vec<(&str, usize)> = table
        .keys()
        .map(|w| (w.as_str(), w.chars().count()))
        .collect();
    words.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut removed: HashSet<&str> = HashSet::new();
    for (i, &(shorter, shorter_len)) in words.iter().enumerate() {
        if removed.contains(shorter) {
            continue;
        }
        for &(longer, longer_len) in &words[i + 1..] {
            if longer_len > shorter_len && !removed.contains(longer) && longer.contains(shorter) {
                removed.insert(longer);
            }
        }
    }

    table
        .iter()
        .filter(|(word, _)| !removed.contains(word))
        .collect()
}

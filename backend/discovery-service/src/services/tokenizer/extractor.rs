use super::NounExtractor;
use crate::lexicon::patterns::{is_digit_adjacent, is_hangul_syllable, is_initialism, is_mixed_script};
use crate::lexicon::Lexicon;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

const MIN_RUN: usize = 2;
const MAX_RUN: usize = 15;

/// Dictionary-free noun extractor for Korean community titles.
///
/// Takes Hangul runs of 2 to 15 syllables from each Unicode word, keeps
/// initialisms and mixed-script tokens whole, then strips one trailing
/// particle. Good enough for short titles; swap in a morphological analyzer
/// through [`NounExtractor`] for anything longer.
pub struct HangulNounExtractor {
    lexicon: Arc<Lexicon>,
}

impl HangulNounExtractor {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    fn push_stem(&self, raw: &str, out: &mut Vec<String>) {
        let stem = self.lexicon.strip_particle(raw);
        if stem.chars().count() >= MIN_RUN {
            out.push(stem.to_string());
        }
    }
}

impl NounExtractor for HangulNounExtractor {
    fn extract_nouns(&self, text: &str) -> Vec<String> {
        let mut nouns = Vec::new();

        for word in text.unicode_words() {
            if is_initialism(word) {
                nouns.push(word.to_string());
                continue;
            }
            if is_mixed_script(word) || is_digit_adjacent(word) {
                self.push_stem(word, &mut nouns);
                continue;
            }

            for run in hangul_runs(word) {
                self.push_stem(&run, &mut nouns);
            }
        }

        nouns
    }
}

/// Maximal Hangul syllable runs, split every [`MAX_RUN`] syllables, shorter than [`MIN_RUN`] dropped
fn hangul_runs(word: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut len = 0usize;

    for c in word.chars() {
        if is_hangul_syllable(c) {
            current.push(c);
            len += 1;
            if len == MAX_RUN {
                runs.push(std::mem::take(&mut current));
                len = 0;
            }
        } else {
            if len >= MIN_RUN {
                runs.push(std::mem::take(&mut current));
            }
            current.clear();
            len = 0;
        }
    }
    if len >= MIN_RUN {
        runs.push(current);
    }

    runs
}

use std::collections::HashSet;

use rand::Rng;

use crate::config::DuplicateSection;

/// Word-overlap heuristic for spotting an already-published title on the
/// blog listing. Words longer than `min_word_len` are lowercased and checked
/// for substring presence in the page text; a ratio strictly above
/// `match_threshold` counts as a duplicate.
#[derive(Debug, Clone, Copy)]
pub struct DuplicatePolicy {
    match_threshold: f64,
    min_word_len: usize,
}

impl DuplicatePolicy {
    pub fn new(match_threshold: f64, min_word_len: usize) -> Self {
        Self {
            match_threshold,
            min_word_len,
        }
    }

    pub fn significant_words(&self, title: &str) -> HashSet<String> {
        title
            .split_whitespace()
            .filter(|word| word.chars().count() > self.min_word_len)
            .map(|word| word.to_lowercase())
            .collect()
    }

    /// Fraction of significant title words present in the page text. A title
    /// without significant words never matches.
    pub fn match_ratio(&self, title: &str, page_text: &str) -> f64 {
        let words = self.significant_words(title);
        if words.is_empty() {
            return 0.0;
        }
        let haystack = page_text.to_lowercase();
        let matched = words
            .iter()
            .filter(|word| haystack.contains(word.as_str()))
            .count();
        matched as f64 / words.len() as f64
    }

    pub fn is_duplicate(&self, title: &str, page_text: &str) -> bool {
        self.match_ratio(title, page_text) > self.match_threshold
    }
}

impl From<&DuplicateSection> for DuplicatePolicy {
    fn from(section: &DuplicateSection) -> Self {
        Self::new(section.match_threshold, section.min_word_len)
    }
}

/// Appends a random `(vN)` marker so a flagged title stays unique.
pub fn versioned_title<R: Rng + ?Sized>(title: &str, rng: &mut R) -> String {
    format!("{title} (v{})", rng.gen_range(2..=99))
}

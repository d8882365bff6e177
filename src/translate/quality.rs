//! Heuristic scoring of translation candidates.
//! Five equal-weight checks; thresholds are configurable defaults, not a
//! contract (0.5 for plain acceptance, 0.7 for the adaptive retry path).

use std::collections::HashSet;

use regex::Regex;

pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.5;
pub const ADAPTIVE_THRESHOLD: f64 = 0.7;

pub struct QualityScorer {
    threshold: f64,
    digits: Regex,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_ACCEPT_THRESHOLD)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            digits: Regex::new(r"\d+").expect("digit pattern"),
        }
    }

    /// Score `translated` against `original` in [0, 1].
    /// A blank translation is unusable and scores 0.0 outright.
    pub fn score(&self, original: &str, translated: &str) -> f64 {
        if translated.trim().is_empty() {
            return 0.0;
        }

        let checks = [
            self.length_ratio(original, translated),
            self.special_chars_preserved(original, translated),
            self.numbers_preserved(original, translated),
            1.0, // non-emptiness, guaranteed above
            self.not_identical(original, translated),
        ];
        checks.iter().sum::<f64>() / checks.len() as f64
    }

    pub fn is_acceptable(&self, original: &str, translated: &str) -> bool {
        self.score(original, translated) >= self.threshold
    }

    fn length_ratio(&self, original: &str, translated: &str) -> f64 {
        if original.is_empty() {
            return 0.0;
        }
        let ratio = translated.chars().count() as f64 / original.chars().count() as f64;
        if (0.3..=3.0).contains(&ratio) {
            1.0
        } else if ratio < 0.1 || ratio > 5.0 {
            0.0
        } else {
            0.5
        }
    }

    /// Fraction of the original's special characters (non-word, non-space,
    /// underscore counts as a word character) also present in the translation.
    fn special_chars_preserved(&self, original: &str, translated: &str) -> f64 {
        let special = |s: &str| -> HashSet<char> {
            s.chars()
                .filter(|c| !c.is_alphanumeric() && *c != '_' && !c.is_whitespace())
                .collect()
        };
        let original_special = special(original);
        if original_special.is_empty() {
            return 1.0;
        }
        let translated_special = special(translated);
        let preserved = original_special.intersection(&translated_special).count();
        preserved as f64 / original_special.len() as f64
    }

    /// 1.0 when the set of numeric substrings matches exactly (or the
    /// original carries none), else 0.5.
    fn numbers_preserved(&self, original: &str, translated: &str) -> f64 {
        let numbers = |s: &str| -> HashSet<String> {
            self.digits.find_iter(s).map(|m| m.as_str().to_string()).collect()
        };
        let original_numbers = numbers(original);
        if original_numbers.is_empty() {
            return 1.0;
        }
        if original_numbers == numbers(translated) {
            1.0
        } else {
            0.5
        }
    }

    /// A verbatim echo is suspicious but not disqualifying.
    fn not_identical(&self, original: &str, translated: &str) -> f64 {
        if original == translated {
            0.5
        } else {
            1.0
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

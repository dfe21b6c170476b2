//! Stylometric feature extraction.
//!
//! A [`StyleFeatureVector`] has ten dimensions in a fixed order:
//!
//! | # | feature | definition |
//! |---|---------|------------|
//! | 0 | function-word rate | closed-class tokens / n |
//! | 1 | average sentence length | tokens per sentence / 50 |
//! | 2 | type-token ratio | unique lowercased tokens / n |
//! | 3 | comma rate | `,` per 100 tokens |
//! | 4 | period rate | `.` per 100 tokens |
//! | 5 | exclamation rate | `!` per 100 tokens |
//! | 6 | question rate | `?` per 100 tokens |
//! | 7 | pronoun rate | personal/possessive pronouns / n |
//! | 8 | reading grade | min(Flesch-Kincaid / 20, 1) |
//! | 9 | average word length | min(chars per token / 10, 1) |
//!
//! Rates divide by `max(1, n)`, so every text yields a well-formed vector. Text
//! without any word token (empty, whitespace, punctuation only) yields zeros.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::text::{count_syllables, grade_from_counts, split_sentences, tokenize_words};

pub const FEATURE_DIM: usize = 10;

pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "function_word_rate",
    "avg_sentence_length",
    "type_token_ratio",
    "comma_rate",
    "period_rate",
    "exclamation_rate",
    "question_rate",
    "pronoun_rate",
    "reading_grade",
    "avg_word_length",
];

const SENTENCE_LENGTH_SCALE: f64 = 50.0;
const PER_HUNDRED: f64 = 100.0;
const GRADE_SCALE: f64 = 20.0;
const WORD_LENGTH_SCALE: f64 = 10.0;

static FUNCTION_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
        "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
        "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
        "what", "so", "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
        "make", "can", "like", "time", "no", "just", "him", "know", "take", "people", "into",
        "year", "your", "good", "some", "could", "them", "see", "other", "than", "then", "now",
        "look", "only", "come", "its", "over",
    ]
    .into_iter()
    .collect()
});

static PRONOUNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
        "your", "his", "its", "our", "their", "mine", "yours", "hers", "ours", "theirs",
        "myself", "yourself", "himself", "herself", "itself", "ourselves", "themselves",
    ]
    .into_iter()
    .collect()
});

/// Fixed-length stylometric signature of one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFeatureVector([f64; FEATURE_DIM]);

/// Why a raw slice cannot become a [`StyleFeatureVector`].
#[derive(Debug, Clone, PartialEq)]
pub enum VectorShapeError {
    WrongDimension { found: usize },
    InvalidValue { index: usize, value: f64 },
}

impl StyleFeatureVector {
    pub const fn zeros() -> Self {
        Self([0.0; FEATURE_DIM])
    }

    pub const fn new(values: [f64; FEATURE_DIM]) -> Self {
        Self(values)
    }

    /// Validate a raw slice: exactly [`FEATURE_DIM`] finite, non-negative values.
    /// Never pads or truncates.
    pub fn from_slice(values: &[f64]) -> Result<Self, VectorShapeError> {
        if values.len() != FEATURE_DIM {
            return Err(VectorShapeError::WrongDimension {
                found: values.len(),
            });
        }
        let mut out = [0.0; FEATURE_DIM];
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(VectorShapeError::InvalidValue { index, value });
            }
            out[index] = value;
        }
        Ok(Self(out))
    }

    pub fn values(&self) -> &[f64; FEATURE_DIM] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Feature values paired with their names, in dimension order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Default for StyleFeatureVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl fmt::Display for StyleFeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        f.write_str("]")
    }
}

fn rate(count: usize, tokens: usize, scale: f64) -> f64 {
    count as f64 / tokens.max(1) as f64 * scale
}

/// Extract the stylometric feature vector of `text`. Never fails.
pub fn extract_features(text: &str) -> StyleFeatureVector {
    let words = tokenize_words(text);
    if words.is_empty() {
        return StyleFeatureVector::zeros();
    }

    let n = words.len();
    let sentences = split_sentences(text).len().max(1);
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    let function_words = lowered
        .iter()
        .filter(|w| FUNCTION_WORDS.contains(w.as_str()))
        .count();
    let pronouns = lowered
        .iter()
        .filter(|w| PRONOUNS.contains(w.as_str()))
        .count();
    let unique = lowered.iter().collect::<HashSet<_>>().len();

    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let grade = grade_from_counts(n, sentences, syllables);
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();

    let count_char = |needle: char| text.chars().filter(|c| *c == needle).count();

    StyleFeatureVector([
        rate(function_words, n, 1.0),
        n as f64 / sentences as f64 / SENTENCE_LENGTH_SCALE,
        rate(unique, n, 1.0),
        rate(count_char(','), n, PER_HUNDRED),
        rate(count_char('.'), n, PER_HUNDRED),
        rate(count_char('!'), n, PER_HUNDRED),
        rate(count_char('?'), n, PER_HUNDRED),
        rate(pronouns, n, 1.0),
        (grade / GRADE_SCALE).min(1.0),
        (chars as f64 / n as f64 / WORD_LENGTH_SCALE).min(1.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   \n\t",
        "Hello world",
        "This is amazing! Love it!",
        "Why? Why not? Because, frankly, we can.",
        "The committee approved the measure unanimously after extensive deliberation.",
        "!!! ... ???",
        "I think you and I should tell them about our plans, don't you?",
    ];

    #[test]
    fn test_empty_text_is_zero_vector() {
        assert_eq!(extract_features(""), StyleFeatureVector::zeros());
        assert_eq!(extract_features("  \n "), StyleFeatureVector::zeros());
    }

    #[test]
    fn test_punctuation_only_is_zero_vector() {
        assert!(extract_features("!!! ... ???").is_zero());
    }

    #[test]
    fn test_all_features_finite_and_non_negative() {
        for text in SAMPLES {
            let v = extract_features(text);
            assert_eq!(v.as_slice().len(), FEATURE_DIM);
            for (name, value) in v.named() {
                assert!(value.is_finite(), "{} not finite for {:?}", name, text);
                assert!(value >= 0.0, "{} negative for {:?}", name, text);
            }
            for idx in [0usize, 2, 7, 8, 9] {
                assert!(v.values()[idx] <= 1.0, "dim {} out of [0,1] for {:?}", idx, text);
            }
        }
    }

    #[test]
    fn test_exclamatory_text_features() {
        let v = extract_features("This is amazing! Love it!");
        let values = v.values();
        // 5 tokens, 2 exclamation marks
        assert!((values[5] - 40.0).abs() < 1e-9);
        assert_eq!(values[4], 0.0);
        // "this" and "it" are function words, "is" is not
        assert!((values[0] - 2.0 / 5.0).abs() < 1e-9);
        // two sentences of 2.5 tokens on average
        assert!((values[1] - 2.5 / 50.0).abs() < 1e-9);
        // "it" is the only pronoun
        assert!((values[7] - 1.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_type_token_ratio_is_case_insensitive() {
        let v = extract_features("The the THE cat");
        assert!((v.values()[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_text_without_terminator_is_single_sentence() {
        let v = extract_features("one two three four five");
        assert!((v.values()[1] - 5.0 / 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_slice_rejects_wrong_dimension() {
        assert_eq!(
            StyleFeatureVector::from_slice(&[0.1; 9]),
            Err(VectorShapeError::WrongDimension { found: 9 })
        );
        assert_eq!(
            StyleFeatureVector::from_slice(&[0.1; 11]),
            Err(VectorShapeError::WrongDimension { found: 11 })
        );
    }

    #[test]
    fn test_from_slice_rejects_negative_and_nan() {
        let mut values = [0.5; FEATURE_DIM];
        values[3] = -1.0;
        assert!(matches!(
            StyleFeatureVector::from_slice(&values),
            Err(VectorShapeError::InvalidValue { index: 3, .. })
        ));
        values[3] = f64::NAN;
        assert!(StyleFeatureVector::from_slice(&values).is_err());
    }

    #[test]
    fn test_serde_is_plain_array() {
        let v = StyleFeatureVector::new([1.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.25]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[1.0,0.0,0.5,0.0,0.0,0.0,0.0,0.0,0.0,0.25]");
    }
}

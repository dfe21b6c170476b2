//! Content sub-scores.
//!
//! The n-gram overlap sub-score is computed here (lexical ROUGE over the shared
//! tokenizer, lowercased, no stemming). Embedding similarity and learned
//! quality come from upstream collaborators as precomputed record fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stylefit_core::text::tokenize_words;

use crate::error::MetricFailure;
use crate::item::EvaluationItem;

pub const METRIC_OVERLAP: &str = "overlap";
pub const METRIC_EMBEDDING: &str = "embedding_similarity";
pub const METRIC_LEARNED: &str = "learned_quality";

/// Precision, recall and F-measure of one ROUGE variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub f: f64,
}

impl RougeScore {
    fn from_hits(hits: usize, candidate_len: usize, reference_len: usize) -> Self {
        if hits == 0 || candidate_len == 0 || reference_len == 0 {
            return Self::default();
        }
        let precision = hits as f64 / candidate_len as f64;
        let recall = hits as f64 / reference_len as f64;
        Self {
            precision,
            recall,
            f: 2.0 * precision * recall / (precision + recall),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScores {
    pub rouge1: RougeScore,
    pub rouge2: RougeScore,
    #[serde(rename = "rougeLsum")]
    pub rouge_lsum: RougeScore,
}

fn lowered_tokens(text: &str) -> Vec<String> {
    tokenize_words(text).into_iter().map(str::to_lowercase).collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// ROUGE-N with clipped n-gram counts.
pub fn rouge_n(candidate: &[String], reference: &[String], n: usize) -> RougeScore {
    let cand = ngram_counts(candidate, n);
    let refs = ngram_counts(reference, n);
    let hits: usize = refs
        .iter()
        .map(|(gram, r)| cand.get(gram).map_or(0, |c| (*c).min(*r)))
        .sum();
    RougeScore::from_hits(
        hits,
        candidate.len().saturating_sub(n - 1),
        reference.len().saturating_sub(n - 1),
    )
}

/// LCS dynamic-programming table of `a` against `b`.
fn lcs_table(a: &[String], b: &[String]) -> Vec<Vec<usize>> {
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp
}

/// Indices into `reference` that take part in one longest common subsequence.
fn lcs_reference_indices(reference: &[String], candidate: &[String]) -> Vec<usize> {
    let dp = lcs_table(reference, candidate);
    let (mut i, mut j) = (reference.len(), candidate.len());
    let mut out = Vec::new();
    while i > 0 && j > 0 {
        if reference[i - 1] == candidate[j - 1] {
            out.push(i - 1);
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    out.reverse();
    out
}

fn summary_sentences(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(lowered_tokens)
        .filter(|s| !s.is_empty())
        .collect()
}

fn token_counts(sentences: &[Vec<String>]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in sentences.iter().flatten() {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Summary-level ROUGE-L: newline-separated sentences, union LCS per reference
/// sentence, hits clipped by token counts on both sides.
pub fn rouge_lsum(candidate: &str, reference: &str) -> RougeScore {
    let cand_sents = summary_sentences(candidate);
    let ref_sents = summary_sentences(reference);
    let cand_len: usize = cand_sents.iter().map(Vec::len).sum();
    let ref_len: usize = ref_sents.iter().map(Vec::len).sum();
    if cand_len == 0 || ref_len == 0 {
        return RougeScore::default();
    }

    let mut cand_counts = token_counts(&cand_sents);
    let mut ref_counts = token_counts(&ref_sents);

    let mut hits = 0usize;
    for r in &ref_sents {
        let mut union: Vec<usize> = cand_sents
            .iter()
            .flat_map(|c| lcs_reference_indices(r, c))
            .collect();
        union.sort_unstable();
        union.dedup();
        for idx in union {
            let token = r[idx].as_str();
            let (Some(rc), Some(cc)) = (ref_counts.get_mut(token), cand_counts.get_mut(token)) else {
                continue;
            };
            if *rc > 0 && *cc > 0 {
                hits += 1;
                *rc -= 1;
                *cc -= 1;
            }
        }
    }
    RougeScore::from_hits(hits, cand_len, ref_len)
}

/// ROUGE-1, ROUGE-2 and ROUGE-Lsum of `candidate` against `reference`.
pub fn rouge_scores(candidate: &str, reference: &str) -> RougeScores {
    let cand = lowered_tokens(candidate);
    let refs = lowered_tokens(reference);
    RougeScores {
        rouge1: rouge_n(&cand, &refs, 1),
        rouge2: rouge_n(&cand, &refs, 2),
        rouge_lsum: rouge_lsum(candidate, reference),
    }
}

/// The three content sub-scores of one item plus whatever failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentScores {
    pub overlap: Option<f64>,
    pub embedding_similarity: Option<f64>,
    pub learned_quality: Option<f64>,
    pub rouge: Option<RougeScores>,
    pub failures: Vec<MetricFailure>,
}

/// Content-metric collaborator. Called concurrently from scoring workers.
pub trait ContentScorer: Send + Sync {
    fn score(&self, item: &EvaluationItem) -> ContentScores;
}

/// Lexical ROUGE-Lsum F for overlap; precomputed embedding and learned scores.
///
/// A missing embedding score is an external metric failure. The learned score
/// is optional and simply absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardContentScorer;

fn valid(metric: &str, value: Option<f64>, failures: &mut Vec<MetricFailure>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        Some(v) => {
            failures.push(MetricFailure::new(metric, format!("non-finite value {}", v)));
            None
        }
        None => None,
    }
}

impl ContentScorer for StandardContentScorer {
    fn score(&self, item: &EvaluationItem) -> ContentScores {
        let mut failures = Vec::new();
        let rouge = rouge_scores(&item.candidate_text, &item.reference_text);

        let embedding_similarity = valid(
            METRIC_EMBEDDING,
            item.precomputed.embedding_similarity,
            &mut failures,
        );
        if item.precomputed.embedding_similarity.is_none() {
            failures.push(MetricFailure::new(METRIC_EMBEDDING, "no precomputed score on record"));
        }
        let learned_quality = valid(METRIC_LEARNED, item.precomputed.learned_quality, &mut failures);

        ContentScores {
            overlap: Some(rouge.rouge_lsum.f),
            embedding_similarity,
            learned_quality,
            rouge: Some(rouge),
            failures,
        }
    }
}

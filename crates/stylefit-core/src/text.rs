//! Word tokenization, sentence segmentation and readability helpers.
//!
//! Every text in a run goes through the same tokenizer: the style features of a
//! persona sample and of a candidate summary are only comparable when they were
//! counted the same way.
//!
//! A word is a maximal run of Unicode letters or digits, optionally joined by an
//! internal apostrophe or hyphen (`don't`, `state-of-the-art`). Punctuation is
//! never a token; punctuation rates are counted on the raw text instead.

use regex::Regex;
use std::sync::OnceLock;

static WORD_RE: OnceLock<Regex> = OnceLock::new();

fn word_re() -> &'static Regex {
    WORD_RE.get_or_init(|| {
        Regex::new(r"[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*").expect("word regex")
    })
}

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc", "inc", "ltd", "co", "e.g",
    "i.e",
];

/// Split text into word tokens.
pub fn tokenize_words(text: &str) -> Vec<&str> {
    word_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Number of word tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    word_re().find_iter(text).count()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Closing quotes and brackets that may follow a terminator before the break.
fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | ')' | ']' | '}')
}

fn ends_with_abbreviation(segment: &str) -> bool {
    let last = segment
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    ABBREVIATIONS.contains(&last.as_str())
}

fn push_segment<'a>(out: &mut Vec<&'a str>, segment: &'a str) {
    let trimmed = segment.trim();
    if word_re().is_match(trimmed) {
        out.push(trimmed);
    }
}

/// Split text into sentences.
///
/// A sentence ends at a run of `.`, `!` or `?` (plus any closing quotes or
/// brackets) followed by whitespace or the end of the text. A lone period after
/// a known abbreviation is not a boundary. Segments without any word token are
/// dropped, and text without terminal punctuation is one sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut j = i;
        while j < chars.len() && is_terminator(chars[j].1) {
            j += 1;
        }
        let mut k = j;
        while k < chars.len() && is_closer(chars[k].1) {
            k += 1;
        }

        let at_boundary = k == chars.len() || chars[k].1.is_whitespace();
        if at_boundary {
            let lone_period = c == '.' && j == i + 1;
            if !(lone_period && ends_with_abbreviation(&text[start..pos])) {
                let end = chars.get(k).map(|(p, _)| *p).unwrap_or(text.len());
                push_segment(&mut out, &text[start..end]);
                start = end;
            }
        }
        i = k.max(i + 1);
    }

    if start < text.len() {
        push_segment(&mut out, &text[start..]);
    }
    out
}

/// Approximate syllable count: one syllable per maximal group of `aeiouy`,
/// minus one for a trailing silent `e`, never below one.
///
/// This heuristic is not dictionary-exact; reading-grade values computed with a
/// different syllable counter are not comparable.
pub fn count_syllables(word: &str) -> usize {
    let lower = word.to_lowercase();
    let mut count = 0usize;
    let mut previous_was_vowel = false;
    for c in lower.chars() {
        let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }
    if lower.ends_with('e') {
        count = count.saturating_sub(1);
    }
    count.max(1)
}

/// Flesch-Kincaid grade level, clamped at zero. Zero for text without words.
pub fn flesch_kincaid_grade(text: &str) -> f64 {
    let words = tokenize_words(text);
    if words.is_empty() {
        return 0.0;
    }
    let sentences = split_sentences(text).len().max(1);
    grade_from_counts(words.len(), sentences, words.iter().map(|w| count_syllables(w)).sum())
}

pub(crate) fn grade_from_counts(words: usize, sentences: usize, syllables: usize) -> f64 {
    if words == 0 {
        return 0.0;
    }
    let words = words as f64;
    let sentences = sentences.max(1) as f64;
    let grade = 0.39 * (words / sentences) + 11.8 * (syllables as f64 / words) - 15.59;
    grade.max(0.0)
}

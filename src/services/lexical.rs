//! Lexical helpers shared by the scorer, classifier and crystallizer.
//!
//! Everything here is deterministic and allocation-light. Candidate text is
//! matched against vocabularies but never rewritten into them.

use std::collections::{HashMap, HashSet};

/// Lowercased word tokens. Inner hyphens and apostrophes are kept, so
/// `multi-step` stays one token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|raw| raw.trim_matches(|c: char| c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Normalized text used for phrase matching: tokens joined by single
/// spaces, padded with a space on both sides.
pub fn normalized(tokens: &[String]) -> String {
    format!(" {} ", tokens.join(" "))
}

/// Whether `term` occurs in the tokenized text.
///
/// Multi-word terms match as a contiguous phrase. Single-word terms match
/// a whole token, or a token prefix when the term has at least five
/// characters (`debug` matches `debugging`).
pub fn term_matches(term: &str, tokens: &[String], normalized_text: &str) -> bool {
    if term.contains(' ') {
        return normalized_text.contains(&format!(" {term} "));
    }
    tokens
        .iter()
        .any(|t| t == term || (term.len() >= 5 && t.starts_with(term)))
}

/// Count how many terms from `vocabulary` occur in the text.
pub fn count_matches(vocabulary: &[&str], tokens: &[String], normalized_text: &str) -> usize {
    vocabulary
        .iter()
        .filter(|term| term_matches(term, tokens, normalized_text))
        .count()
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "with", "is", "are", "be",
    "it", "its", "this", "that", "as", "at", "by", "from", "when", "then", "than", "into",
];

/// Content tokens: tokens minus a small stopword list.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Jaccard distance between the content-token sets of two texts.
///
/// Two empty texts have distance zero.
pub fn jaccard_distance(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = content_tokens(a).into_iter().collect();
    let right: HashSet<String> = content_tokens(b).into_iter().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    1.0 - intersection as f64 / union as f64
}

/// Cosine similarity of bag-of-words term-frequency vectors over content
/// tokens. Returns zero if either side has no content tokens.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let left = term_frequencies(a);
    let right = term_frequencies(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let dot: f64 = left
        .iter()
        .filter_map(|(term, x)| right.get(term).map(|y| x * y))
        .sum();
    let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
    (dot / (norm(&left) * norm(&right))).clamp(0.0, 1.0)
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut freq = HashMap::new();
    for token in content_tokens(text) {
        *freq.entry(token).or_insert(0.0) += 1.0;
    }
    freq
}

//! Near-duplicate suppression over search hits.

use std::collections::HashSet;

use ctxrot_core::types::RetrievalResult;

/// Lowercased word set with punctuation stripped.
fn words(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Jaccard similarity of the word sets of `a` and `b`; `None` when both are empty.
pub fn jaccard(a: &str, b: &str) -> Option<f64> {
    overlap(&words(a), &words(b))
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> Option<f64> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    Some(a.intersection(b).count() as f64 / union as f64)
}

/// Drop every hit whose word overlap with an already kept hit exceeds `threshold`.
///
/// Hits are visited in order, so the closest of a group of near-duplicates survives.
pub fn deduplicate(hits: RetrievalResult, threshold: f64) -> RetrievalResult {
    let mut kept: RetrievalResult = Vec::with_capacity(hits.len());
    let mut kept_words: Vec<HashSet<String>> = Vec::with_capacity(hits.len());
    for hit in hits {
        let w = words(&hit.entry.segment.text);
        let duplicate = kept_words.iter().any(|existing| overlap(&w, existing).is_some_and(|j| j > threshold));
        if !duplicate {
            kept_words.push(w);
            kept.push(hit);
        }
    }
    kept
}

/// Keep the first hit for each distinct segment text.
pub fn distinct_texts(hits: RetrievalResult) -> RetrievalResult {
    let mut seen = HashSet::new();
    hits.into_iter().filter(|h| seen.insert(h.entry.segment.text.clone())).collect()
}

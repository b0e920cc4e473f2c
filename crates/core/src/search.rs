//! Lexical overlap scoring for cache search.
//!
//! Cache search is deliberately simple: the query and each candidate's
//! normalized description are split into word sets and scored by overlap.
//! No stemming, no embeddings — semantic similarity is a non-goal.

use std::collections::HashSet;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Maximum number of search results.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Score the overlap between a normalized query and a normalized
/// description.
///
/// Both inputs are split on whitespace into word sets; the score is
/// `|intersection| / max(|query words|, |entry words|)`, so a perfect
/// match scores 1.0 and disjoint texts score 0.0.
pub fn overlap_score(normalized_query: &str, normalized_description: &str) -> f64 {
    let query: HashSet<&str> = normalized_query.split_whitespace().collect();
    let entry: HashSet<&str> = normalized_description.split_whitespace().collect();

    if query.is_empty() || entry.is_empty() {
        return 0.0;
    }

    let intersection = query.intersection(&entry).count();
    intersection as f64 / query.len().max(entry.len()) as f64
}

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

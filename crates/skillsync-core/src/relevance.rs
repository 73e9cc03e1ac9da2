//! Lightweight text-relevance scoring used to rank search results.
//!
//! # Scoring
//!
//! Content is tokenized (lowercase, split on anything that is not a letter
//! or digit) and each token is Porter-stemmed. Every search term is stemmed
//! the same way and compared against every content stem:
//!
//! | Match | Points |
//! |-------|--------|
//! | stems are equal | [`EXACT_MATCH_WEIGHT`] |
//! | one stem contains the other | [`PARTIAL_MATCH_WEIGHT`] |
//!
//! The raw sum is scaled by a density multiplier `1 + matches / tokens`
//! (so short, focused content outranks long content with the same hits)
//! and divided by the number of search terms.

use crate::stemmer::stem;

/// Points for a content stem equal to a term stem.
pub const EXACT_MATCH_WEIGHT: f64 = 2.0;

/// Points for a content stem that contains, or is contained in, a term stem.
pub const PARTIAL_MATCH_WEIGHT: f64 = 1.0;

/// Split text into lowercase alphanumeric words.
///
/// ```
/// use skillsync_core::relevance::tokenize;
///
/// assert_eq!(tokenize("Step 1: Use VPN!"), vec!["step", "1", "use", "vpn"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokenize a free-text query into search terms.
pub fn search_terms(query: &str) -> Vec<String> {
    tokenize(query)
}

fn stems(words: &[String]) -> Vec<String> {
    words.iter().map(|w| stem(&w.to_lowercase())).collect()
}

fn is_partial_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.contains(short)
}

/// Score `content` against already tokenized search `terms`.
///
/// Returns `0.0` when there are no terms, no content, or no matches.
pub fn calculate_relevance(content: &str, terms: &[String]) -> f64 {
    let term_stems = stems(terms);
    if term_stems.is_empty() {
        return 0.0;
    }

    let content_stems = stems(&tokenize(content));
    if content_stems.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    let mut matches = 0usize;
    for term in &term_stems {
        for token in &content_stems {
            if token == term {
                score += EXACT_MATCH_WEIGHT;
                matches += 1;
            } else if is_partial_match(token, term) {
                score += PARTIAL_MATCH_WEIGHT;
                matches += 1;
            }
        }
    }

    let density = 1.0 + matches as f64 / content_stems.len() as f64;
    score * density / term_stems.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(q: &str) -> Vec<String> {
        search_terms(q)
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("React Component Best-Practices"),
            vec!["react", "component", "best", "practices"]
        );
        assert!(tokenize("  ... --- ").is_empty());
    }

    #[test]
    fn test_exact_match_scores_two_points_with_density() {
        // one token, one exact hit: 2 * (1 + 1/1) / 1
        let score = calculate_relevance("database", &terms("databases"));
        assert!((score - 4.0).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_partial_match_scores_one_point() {
        // "connect" is contained in "connectionpool"
        let score = calculate_relevance("connectionpool", &terms("connect"));
        assert!((score - 2.0).abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn test_short_stems_match_partially() {
        // "go" is contained in "good": 1 * (1 + 1/1) / 1
        let score = calculate_relevance("good", &terms("go"));
        assert!((score - 2.0).abs() < 1e-9, "got {}", score);
        assert!(calculate_relevance("build", &terms("ui")) > 0.0);
    }

    #[test]
    fn test_normalized_by_term_count() {
        let one = calculate_relevance("vpn", &terms("vpn"));
        let two = calculate_relevance("vpn", &terms("vpn zebra"));
        assert!((one / 2.0 - two).abs() < 1e-9);
    }

    #[test]
    fn test_denser_content_scores_higher() {
        let focused = calculate_relevance("database pooling", &terms("database"));
        let diluted = calculate_relevance(
            "database notes about many unrelated topics and meetings",
            &terms("database"),
        );
        assert!(focused > diluted);
    }

    #[test]
    fn test_verbatim_title_term_beats_unrelated_content() {
        let q = terms("onboarding");
        let hit = calculate_relevance("Client Onboarding Process", &q);
        let miss = calculate_relevance("Database Connection SOP", &q);
        assert!(hit > 0.0);
        assert!(hit > miss);
        assert_eq!(miss, 0.0);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(calculate_relevance("anything", &[]), 0.0);
        assert_eq!(calculate_relevance("", &terms("anything")), 0.0);
    }

    #[test]
    fn test_more_occurrences_never_score_lower() {
        let q = terms("hooks");
        let once = calculate_relevance("use hooks in components", &q);
        let twice = calculate_relevance("use hooks and more hooks in components", &q);
        assert!(twice >= once);
    }
}

//! Fuzzy tool-name matcher.
//!
//! Scores are distances: 0.0 is an exact match and anything above
//! [`MATCH_THRESHOLD`] is discarded.

use std::collections::HashMap;

use strsim::normalized_levenshtein;

use super::{query_terms, tokens};
use crate::retrieval::catalog::Catalog;

/// Largest distance still considered a match.
pub const MATCH_THRESHOLD: f64 = 0.4;

/// Matches kept per query term.
const MATCHES_PER_TERM: usize = 2;

/// A catalog tool close to some query term.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub id: String,
    pub name: String,
    /// Lower is better.
    pub score: f64,
}

/// Distance between a query term and one word of a tool name.
fn word_distance(term: &str, word: &str) -> f64 {
    if term == word {
        0.0
    } else if word.starts_with(term) {
        #[allow(clippy::cast_precision_loss)]
        let ratio = term.len() as f64 / word.len() as f64;
        0.3 * (1.0 - ratio)
    } else {
        1.0 - normalized_levenshtein(term, word)
    }
}

/// Distance between a query term and a tool name: the best over its words
/// and over the name with spaces removed.
fn name_distance(term: &str, name: &str) -> f64 {
    let words = tokens(name);
    let joined = words.concat();
    words
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(joined.as_str()))
        .map(|word| word_distance(term, word))
        .fold(f64::INFINITY, f64::min)
}

/// Match query terms against every catalog name.
///
/// Returns at most two matches per term, deduplicated by tool id (keeping the
/// best score), sorted by ascending score.
#[must_use]
pub fn match_names(query: &str, catalog: &Catalog) -> Vec<FuzzyMatch> {
    let mut best: HashMap<&str, FuzzyMatch> = HashMap::new();

    for term in query_terms(query) {
        let mut scored: Vec<(f64, &str, &str)> = catalog
            .entries()
            .iter()
            .map(|entry| (name_distance(&term, &entry.name), entry.id.as_str(), entry.name.as_str()))
            .filter(|(score, _, _)| *score <= MATCH_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.2.cmp(b.2)));

        for (score, id, name) in scored.into_iter().take(MATCHES_PER_TERM) {
            best.entry(id)
                .and_modify(|m| m.score = m.score.min(score))
                .or_insert_with(|| FuzzyMatch {
                    id: id.to_string(),
                    name: name.to_string(),
                    score,
                });
        }
    }

    let mut matches: Vec<FuzzyMatch> = best.into_values().collect();
    matches.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.name.cmp(&b.name)));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_documents(&[
            json!({ "id": "1", "name": "Cursor" }),
            json!({ "id": "2", "name": "GitHub Copilot" }),
            json!({ "id": "3", "name": "Codeium" }),
            json!({ "id": "4", "name": "Tabnine" }),
        ])
    }

    #[test]
    fn test_exact_word_scores_zero() {
        let matches = match_names("copilot for teams", &catalog());
        assert_eq!(matches.first().map(|m| m.name.as_str()), Some("GitHub Copilot"));
        assert!(matches.first().is_some_and(|m| m.score.abs() < f64::EPSILON));
    }

    #[test]
    fn test_prefix_and_typo_matches() {
        let matches = match_names("tabnin", &catalog());
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score > 0.0 && matches[0].score <= MATCH_THRESHOLD);

        let matches = match_names("cursr", &catalog());
        assert_eq!(matches.first().map(|m| m.id.as_str()), Some("1"));
    }

    #[test]
    fn test_short_and_vocabulary_terms_are_ignored() {
        assert!(match_names("ai cli web", &catalog()).is_empty());
    }

    #[test]
    fn test_dedup_keeps_best_score() {
        let matches = match_names("cursor cursr", &catalog());
        let cursor: Vec<_> = matches.iter().filter(|m| m.id == "1").collect();
        assert_eq!(cursor.len(), 1);
        assert!(cursor[0].score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sorted_ascending() {
        let matches = match_names("codeium copilt", &catalog());
        assert!(matches.windows(2).all(|w| w[0].score <= w[1].score));
    }
}

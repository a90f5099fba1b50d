//! Named-entity recognition against the tool catalog.

use toolscout_core::vocabulary::is_vocabulary_term;

use super::tokens;
use crate::retrieval::catalog::Catalog;

/// Catalog names occurring as whole words in the query (case-insensitive),
/// in order of first appearance. Longer names win at the same position.
#[must_use]
pub fn recognize(query: &str, catalog: &Catalog) -> Vec<String> {
    let query_tokens = tokens(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut found: Vec<(usize, usize, &str)> = catalog
        .entries()
        .iter()
        .filter(|entry| !is_vocabulary_term(&entry.name))
        .filter_map(|entry| {
            let name_tokens = tokens(&entry.name);
            if name_tokens.is_empty() {
                return None;
            }
            query_tokens
                .windows(name_tokens.len())
                .position(|window| window == name_tokens.as_slice())
                .map(|position| (position, name_tokens.len(), entry.name.as_str()))
        })
        .collect();

    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

    let mut names: Vec<String> = Vec::with_capacity(found.len());
    for (_, _, name) in found {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_documents(&[
            json!({ "id": "1", "name": "Cursor" }),
            json!({ "id": "2", "name": "GitHub Copilot" }),
            json!({ "id": "3", "name": "Copilot" }),
            json!({ "id": "4", "name": "Next.js" }),
            json!({ "id": "5", "name": "Terminal" }),
        ])
    }

    #[test]
    fn test_whole_word_matches_in_query_order() {
        let names = recognize("is github copilot better than cursor", &catalog());
        assert_eq!(names, vec!["GitHub Copilot", "Copilot", "Cursor"]);
    }

    #[test]
    fn test_partial_words_do_not_match() {
        assert!(recognize("cursors and copilots", &catalog()).is_empty());
    }

    #[test]
    fn test_punctuated_names() {
        assert_eq!(recognize("hosting for next.js apps", &catalog()), vec!["Next.js"]);
    }

    #[test]
    fn test_vocabulary_names_are_skipped() {
        assert!(recognize("a terminal editor", &catalog()).is_empty());
    }
}

//! Intent extraction: detectors, name resolution and the structuring call.
//!
//! Every detector is independent and fail-soft. They run concurrently in two
//! phases: the reference extractor needs the comparative flag and the
//! classifier needs the semantic pre-filter, everything else runs first.

pub mod classifier;
pub mod comparative;
pub mod entities;
mod fail_soft;
pub mod fuzzy;
pub mod interface;
mod intent;
pub mod name_resolver;
pub mod price;
pub mod reference;
pub mod semantic;

pub use fail_soft::{DetectorError, fail_soft};
pub use intent::{Extraction, IntentExtractor, PROMPT_HEADER as STRUCTURING_PROMPT_HEADER};

use toolscout_core::vocabulary::is_vocabulary_term;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "best", "but", "by", "can", "for", "from",
    "good", "has", "have", "how", "i", "in", "is", "it", "me", "my", "need", "of", "on", "or",
    "other", "similar", "some", "than", "that", "the", "their", "them", "there", "these", "this",
    "to", "tool", "tools", "under", "use", "using", "want", "what", "which", "who", "with",
    "without", "would", "you", "cheaper", "cheap", "better", "alternative", "alternatives",
    "instead", "like", "versus", "vs", "compare", "app", "apps", "software", "per", "month",
    "year", "free", "paid",
];

/// Whether a word carries no tool-name information.
pub(crate) fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Lowercase alphanumeric tokens (`+` and `#` count as word characters).
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Query tokens worth matching against tool names.
pub(crate) fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in tokens(query) {
        if token.chars().count() > 2
            && !is_stop_word(&token)
            && !is_vocabulary_term(&token)
            && !terms.contains(&token)
        {
            terms.push(token);
        }
    }
    terms
}

/// Trim and collapse internal whitespace.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! The retrieval pipeline: intent extraction, query planning and execution.
//!
//! Every external system is reached through the capability traits in
//! `toolscout_core`, so the whole pipeline runs against the in-memory stubs
//! in tests.

pub mod catalog;
pub mod embedding_cache;
pub mod executor;
pub mod extraction;
pub mod pipeline;
pub mod planner;

pub use catalog::{Catalog, CatalogCache};
pub use embedding_cache::{CachedEmbedder, EmbeddingCache};
pub use executor::QueryExecutor;
pub use extraction::{Extraction, IntentExtractor};
pub use pipeline::{CollectionReport, Pipeline, PlannedQuery};
pub use planner::{PlanOptions, QueryPlanner};

/// The slice from the first `open` to the last `close`, inclusive.
///
/// Model answers often wrap JSON in prose or code fences.
pub(crate) fn json_block(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| text.get(start..=end)).flatten()
}

#[cfg(test)]
mod tests {
    use super::json_block;

    #[test]
    fn test_json_block() {
        assert_eq!(
            json_block("Here:\n```json\n{\"a\": {\"b\": 1}}\n```", '{', '}'),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(json_block("order [1, 2]", '[', ']'), Some("[1, 2]"));
        assert_eq!(json_block("} nothing {", '{', '}'), None);
        assert_eq!(json_block("none", '{', '}'), None);
    }
}
